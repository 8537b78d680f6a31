//! End-to-end tests for the deploy pipeline.
//!
//! Every test runs the real normalizer, validator, planner and driver
//! against temp-dir fixtures, a scripted container runtime and either the
//! in-memory or the file-backed mount store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::WarningKind;
use sqdeploy_compose::parser;
use sqdeploy_compose::plan::{self, DeploymentPlan};
use sqdeploy_compose::store::{MemoryStore, MountStore, OverrideFileStore};
use sqdeploy_compose::writer::CommitOutcome;
use sqdeploy_runtime::backend::ContainerRuntime;
use sqdeploy_runtime::driver::Driver;
use sqdeploy_runtime::exec::ExecOutput;
use sqdeploy_runtime::identity::HostIdentity;
use sqdeploy_runtime::pipeline::{Stage, StageOutcome};
use sqdeploy_runtime::readiness::ReadinessPolicy;

// ── Scripted runtime ────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    calls: Vec<String>,
    /// Paths `test -d` / `test -f` succeed for.
    present: HashSet<String>,
    /// Status polls answered "Created" before the first "Up".
    not_ready_polls: u32,
    never_ready: bool,
    fail_up: bool,
    fail_ln: bool,
    fail_chown: bool,
    fail_reload: bool,
}

#[derive(Clone, Default)]
struct ScriptedRuntime(Arc<Mutex<Script>>);

impl ScriptedRuntime {
    fn with(script: Script) -> Self {
        Self(Arc::new(Mutex::new(script)))
    }

    fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().calls.clone()
    }

    fn calls_starting(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

fn failure() -> ExecOutput {
    ExecOutput::failed(1, "scripted failure")
}

impl ContainerRuntime for ScriptedRuntime {
    fn up(&self, rebuild: bool) -> Result<()> {
        let mut s = self.0.lock().unwrap();
        s.calls.push(format!("up rebuild={rebuild}"));
        if s.fail_up {
            return Err(DeployError::Runtime {
                operation: "compose up".into(),
                message: "build failed".into(),
            });
        }
        Ok(())
    }

    fn down(&self) -> Result<()> {
        self.0.lock().unwrap().calls.push("down".into());
        Ok(())
    }

    fn status(&self, container: &str) -> Result<Option<String>> {
        let mut s = self.0.lock().unwrap();
        s.calls.push(format!("status {container}"));
        if s.never_ready {
            return Ok(Some("Exited (1) 2 seconds ago".into()));
        }
        if s.not_ready_polls > 0 {
            s.not_ready_polls -= 1;
            return Ok(Some("Created".into()));
        }
        Ok(Some("Up 5 seconds".into()))
    }

    fn exec(&self, container: &str, user: Option<&str>, argv: &[String]) -> Result<ExecOutput> {
        let mut s = self.0.lock().unwrap();
        let user = user.map_or_else(String::new, |u| format!("[{u}] "));
        s.calls
            .push(format!("exec {container} {user}{}", argv.join(" ")));
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let out = match args.as_slice() {
            ["test", _, path] if s.present.contains(*path) => ExecOutput::ok(""),
            ["test", ..] => failure(),
            ["ln", ..] if s.fail_ln => failure(),
            ["chown", ..] if s.fail_chown => failure(),
            ["sh", "-c", cmd] if s.fail_reload && cmd.contains("pkill") => failure(),
            _ => ExecOutput::ok(""),
        };
        Ok(out)
    }

    fn copy_into(&self, container: &str, host_path: &Path, dest_dir: &str) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .calls
            .push(format!("cp {} {container}:{dest_dir}", host_path.display()));
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

const ROOT: &str = "/srv/htdocs";

struct Course {
    dir: tempfile::TempDir,
}

impl Course {
    /// Assignments A, B, C and password file users.pass on disk.
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["A", "B", "C"] {
            std::fs::create_dir(dir.path().join(name)).expect("mkdir");
        }
        std::fs::write(dir.path().join("users.pass"), "alice:x\n").expect("write");
        std::fs::write(dir.path().join("sqtpm.cfg"), "lang=c\n").expect("write");
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn layout(&self) -> ServiceLayout {
        ServiceLayout {
            server_root: ROOT.into(),
            project_dir: self.dir.path().to_path_buf(),
            ..ServiceLayout::default()
        }
    }

    fn plan(&self, tokens: &[String]) -> DeploymentPlan {
        plan::build_plan(parser::normalize_pairs(tokens)).expect("plan")
    }

    fn scenario_tokens(&self) -> Vec<String> {
        vec![
            format!("{}:{}", self.path("A"), self.path("users.pass")),
            format!("{},{}", self.path("B"), self.path("C")),
        ]
    }
}

fn all_mounted() -> HashSet<String> {
    ["A", "B", "C", "users.pass"]
        .iter()
        .map(|n| format!("{ROOT}/{n}"))
        .collect()
}

fn driver(runtime: &ScriptedRuntime, layout: ServiceLayout) -> Driver {
    Driver::new(Box::new(runtime.clone()), layout)
        .with_readiness(ReadinessPolicy::immediate(5))
        .with_identity(HostIdentity {
            uid: 1000,
            gid: 1000,
        })
}

// ── Full pipeline ───────────────────────────────────────────────────

#[test]
fn scenario_mounts_five_entries_and_links_once() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let store = MemoryStore::new();
    let plan = course.plan(&course.scenario_tokens());

    let report = driver(&runtime, course.layout())
        .deploy(&plan, &store)
        .expect("deploy");

    let declaration = store.current().expect("persisted");
    assert_eq!(declaration.len(), 5);
    assert_eq!(declaration.bindings()[0].container_path, format!("{ROOT}/data"));
    assert_eq!(
        report.links,
        vec![format!("{ROOT}/A/users.pass")],
        "only A is paired with users.pass"
    );
    assert_eq!(
        runtime.calls_starting("exec sqtpm-sqtpm-web-1 ln"),
        vec![format!(
            "exec sqtpm-sqtpm-web-1 ln -s ../users.pass {ROOT}/A/users.pass"
        )]
    );
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.final_status.as_deref(), Some("Up 5 seconds"));
    assert!(matches!(report.commit, CommitOutcome::Saved { bindings: 5, .. }));
}

#[test]
fn stages_run_in_fixed_order() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        not_ready_polls: 2,
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");

    let stages: Vec<Stage> = report.stages.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Start,
            Stage::WaitReady,
            Stage::CreateLinks,
            Stage::FixPermissions,
            Stage::Reload
        ]
    );
    assert_eq!(report.stages[1].outcome, StageOutcome::Ready { attempts: 3 });

    let calls = runtime.calls();
    let pos = |needle: &str| {
        calls
            .iter()
            .position(|c| c.contains(needle))
            .unwrap_or_else(|| panic!("missing call {needle}: {calls:?}"))
    };
    assert!(pos("up rebuild=true") < pos("status"));
    assert!(pos("ln -s") < pos("chown"));
    assert!(pos("chown") < pos("fix-perms.sh"));
    assert!(pos("fix-perms.sh") < pos("pkill"));
}

#[test]
fn permission_fixup_runs_as_host_identity() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let _ = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");

    let calls = runtime.calls();
    assert!(calls.contains(&format!(
        "exec sqtpm-sqtpm-web-1 [root] chown -R 1000:1000 {ROOT}"
    )));
    assert!(calls.iter().any(|c| c.starts_with("exec sqtpm-sqtpm-web-1 [1000:1000] sh -c cd ")
        && c.contains("sh Utils/fix-perms.sh")));
}

// ── Recoverable failures ────────────────────────────────────────────

#[test]
fn missing_mount_in_container_skips_link_only() {
    let course = Course::new();
    let mut present = all_mounted();
    let _ = present.remove(&format!("{ROOT}/users.pass"));
    let runtime = ScriptedRuntime::with(Script {
        present,
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy still succeeds");

    assert!(report.links.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::LinkPrecheck);
    assert!(runtime.calls_starting("exec sqtpm-sqtpm-web-1 ln").is_empty());
    assert!(report.stages.iter().any(|r| r.stage == Stage::Reload));
}

#[test]
fn reload_failure_is_only_a_warning() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        fail_reload: true,
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");

    assert_eq!(
        report.stages.last().map(|r| &r.outcome),
        Some(&StageOutcome::Reloaded { ok: false })
    );
    assert!(report.warnings.iter().any(|w| w.kind == WarningKind::Reload));
}

#[test]
fn invalid_refs_become_warnings_in_report() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let tokens = vec![
        format!("{},{}", course.path("A"), course.path("missing")),
        course.path("also-missing"),
    ];
    let plan = course.plan(&tokens);
    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");
    assert_eq!(report.mounts.declaration.len(), 2);
    assert_eq!(
        report
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::MissingPath)
            .count(),
        2
    );
}

// ── Fatal failures ──────────────────────────────────────────────────

#[test]
fn link_command_failure_aborts_before_permissions() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        fail_ln: true,
        ..Script::default()
    });
    let store = MemoryStore::new();
    let plan = course.plan(&course.scenario_tokens());
    let err = driver(&runtime, course.layout())
        .deploy(&plan, &store)
        .unwrap_err();

    assert!(matches!(err, DeployError::LinkFailed { .. }), "got: {err}");
    assert!(runtime.calls_starting("exec sqtpm-sqtpm-web-1 [root] chown").is_empty());
    assert!(store.current().is_some(), "mount state stays committed");
}

#[test]
fn readiness_timeout_is_fatal() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        never_ready: true,
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let err = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .unwrap_err();

    assert!(matches!(err, DeployError::ReadyTimeout { attempts: 5, .. }));
    assert!(runtime.calls_starting("exec").is_empty());
}

#[test]
fn start_failure_is_fatal_after_commit() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        fail_up: true,
        ..Script::default()
    });
    let store = MemoryStore::new();
    let plan = course.plan(&course.scenario_tokens());
    let err = driver(&runtime, course.layout())
        .deploy(&plan, &store)
        .unwrap_err();
    assert!(matches!(err, DeployError::Runtime { .. }));
    assert_eq!(store.current().map(|d| d.len()), Some(5));
}

#[test]
fn chown_failure_is_fatal() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        fail_chown: true,
        ..Script::default()
    });
    let plan = course.plan(&course.scenario_tokens());
    let err = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .unwrap_err();
    assert!(matches!(err, DeployError::PermissionFixup { .. }));
    assert!(runtime.calls_starting("exec sqtpm-sqtpm-web-1 sh -c pkill").is_empty());
}

#[test]
fn mount_state_write_failure_touches_no_container() {
    let course = Course::new();
    let runtime = ScriptedRuntime::default();
    let plan = course.plan(&course.scenario_tokens());
    let err = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::failing())
        .unwrap_err();
    assert!(matches!(err, DeployError::Io { .. }));
    assert!(runtime.calls().is_empty());
}

#[test]
fn nothing_valid_means_nothing_to_deploy() {
    let course = Course::new();
    let err = plan::build_plan(parser::normalize_pairs(&[course.path("nope")])).unwrap_err();
    assert!(matches!(err, DeployError::NothingToDeploy));
}

// ── Modes ───────────────────────────────────────────────────────────

#[test]
fn build_only_stops_after_readiness() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let mut plan = course.plan(&course.scenario_tokens());
    plan.options.build_only = true;
    plan.options.no_rebuild = true;

    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");
    assert_eq!(report.stages.len(), 2);
    assert!(runtime.calls().contains(&"up rebuild=false".to_string()));
    assert!(runtime.calls_starting("exec").is_empty());
}

#[test]
fn no_start_and_copy_pass_files() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let mut plan = course.plan(&course.scenario_tokens());
    plan.options.no_start = true;
    plan.options.copy_pass_files = true;

    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");
    assert!(runtime.calls_starting("up").is_empty());
    assert_eq!(
        runtime.calls_starting("cp "),
        vec![format!("cp {} sqtpm-sqtpm-web-1:{ROOT}", course.path("users.pass"))]
    );
    assert!(report
        .stages
        .iter()
        .any(|r| r.outcome == StageOutcome::Copied { files: 1, skipped: 0 }));
}

#[test]
fn copy_skips_files_bind_mounted_by_the_start() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let mut plan = course.plan(&course.scenario_tokens());
    plan.options.copy_pass_files = true;

    let report = driver(&runtime, course.layout())
        .deploy(&plan, &MemoryStore::new())
        .expect("deploy");
    assert!(runtime.calls_starting("cp ").is_empty());
    assert!(report
        .stages
        .iter()
        .any(|r| r.outcome == StageOutcome::Copied { files: 0, skipped: 1 }));
}

#[test]
fn no_start_skips_files_mounted_by_an_earlier_run() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let store = MemoryStore::new();
    let drv = driver(&runtime, course.layout());
    let _ = drv
        .deploy(&course.plan(&course.scenario_tokens()), &store)
        .expect("first deploy");

    let mut plan = course.plan(&course.scenario_tokens());
    plan.options.no_start = true;
    plan.options.copy_pass_files = true;
    let _ = drv.deploy(&plan, &store).expect("second deploy");
    assert!(runtime.calls_starting("cp ").is_empty());
}

#[test]
fn cleanup_removes_state_and_brings_project_down() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let layout = course.layout();
    let store = OverrideFileStore::from_layout(&layout);
    let plan = course.plan(&course.scenario_tokens());
    let drv = driver(&runtime, layout);
    let _ = drv.deploy(&plan, &store).expect("deploy");
    assert!(store.path().exists());

    let report = drv.cleanup(&store).expect("cleanup");
    assert!(matches!(report.commit, CommitOutcome::Removed { existed: true, .. }));
    assert!(!store.path().exists());
    assert_eq!(runtime.calls().last().map(String::as_str), Some("down"));
}

// ── Reconciliation across runs ──────────────────────────────────────

#[test]
fn repeated_deploys_are_idempotent_on_disk() {
    let course = Course::new();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let layout = course.layout();
    let store = OverrideFileStore::from_layout(&layout);
    let plan = course.plan(&course.scenario_tokens());
    let drv = driver(&runtime, layout);

    let _ = drv.deploy(&plan, &store).expect("first");
    let first = std::fs::read_to_string(store.path()).expect("read");
    let report = drv.deploy(&plan, &store).expect("second");
    let second = std::fs::read_to_string(store.path()).expect("read");

    assert_eq!(first, second);
    assert!(!report.mounts.has_changes());
}

#[test]
fn config_override_swaps_between_runs() {
    let course = Course::new();
    let other_cfg: PathBuf = course.dir.path().join("other.cfg");
    std::fs::write(&other_cfg, "lang=python\n").expect("write");
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let layout = course.layout();
    let store = MemoryStore::new();
    let drv = driver(&runtime, layout);

    let yaml = |cfg: &str| {
        format!(
            "assignments:\n  {}: []\nconfig_file: {cfg}\n",
            course.path("A")
        )
    };
    let first = plan::build_plan(parser::normalize_yaml(&yaml(&course.path("sqtpm.cfg"))).expect("yaml"))
        .expect("plan");
    let _ = drv.deploy(&first, &store).expect("first");
    let second = plan::build_plan(
        parser::normalize_yaml(&yaml(&other_cfg.to_string_lossy())).expect("yaml"),
    )
    .expect("plan");
    let _ = drv.deploy(&second, &store).expect("second");

    let declaration = store.current().expect("persisted");
    let cfg: Vec<_> = declaration
        .bindings()
        .iter()
        .filter(|b| b.container_path == format!("{ROOT}/sqtpm.cfg"))
        .collect();
    assert_eq!(cfg.len(), 1);
    assert_eq!(cfg[0].host_path, other_cfg.to_string_lossy());
}

#[test]
fn file_store_survives_between_processes() {
    let course = Course::new();
    let layout = course.layout();
    let runtime = ScriptedRuntime::with(Script {
        present: all_mounted(),
        ..Script::default()
    });
    let first_plan = course.plan(&[course.path("A")]);
    let _ = driver(&runtime, layout.clone())
        .deploy(&first_plan, &OverrideFileStore::from_layout(&layout))
        .expect("first");

    let second_plan = course.plan(&[course.path("B")]);
    let report = driver(&runtime, layout.clone())
        .deploy(&second_plan, &OverrideFileStore::from_layout(&layout))
        .expect("second");

    let loaded = OverrideFileStore::from_layout(&layout)
        .load()
        .expect("load")
        .expect("present");
    assert_eq!(loaded.len(), 3);
    assert_eq!(report.mounts.added().count(), 1);
}
