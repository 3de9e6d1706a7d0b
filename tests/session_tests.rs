//! Session Tests
//!
//! Tests for:
//! - Solver creation defaults, current solver and edit state
//! - Context broadcasting to observers
//! - Driver edits through the session, mirror mapping files, settings files
//! - Built-in extensions (copy/paste, inbetweens, baking, zeroing)

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use glam::{DMat4, DVec3};

use pose_wrangler::extensions::{BakePoses, CopyPasteTrs, GenerateInbetweens, ZeroDefaultPose};
use pose_wrangler::math::{Trs, euler_degrees_to_quat};
use pose_wrangler::mirror::MirrorMappingDocument;
use pose_wrangler::session::SolverDefaults;
use pose_wrangler::{Context, MemoryScene, PoseWranglerError, SceneGraph, Session, Settings, SolverHandle};

const EPSILON: f64 = 1e-6;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn arm_scene() -> Result<MemoryScene> {
    let mut scene = MemoryScene::new();
    let shoulder = scene.add("J_l_shoulder", None)?;
    scene.add("J_l_elbow", Some(shoulder))?;
    scene.add("J_l_wrist", None)?;
    let right = scene.add("J_r_shoulder", None)?;
    scene.add("J_r_elbow", Some(right))?;
    scene.set_local_matrix("J_l_elbow", DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)));
    scene.set_local_matrix("J_r_elbow", DMat4::from_translation(DVec3::new(-10.0, 0.0, 0.0)));
    Ok(scene)
}

fn session() -> Result<Session<MemoryScene>> {
    init_logger();
    Ok(Session::new(arm_scene()?)?)
}

/// Solver with driver `J_l_shoulder` and driven `J_l_elbow`, current and editing.
fn arm_solver(session: &mut Session<MemoryScene>) -> Result<SolverHandle> {
    let solver = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder"])?;
    session.add_driven(solver, &["J_l_elbow"])?;
    Ok(solver)
}

fn pose_arm(session: &mut Session<MemoryScene>, shoulder_z: f64, elbow: DVec3) {
    let scene = session.scene_mut();
    scene.set_trs(
        "J_l_shoulder",
        &Trs {
            rotation: DVec3::new(0.0, 0.0, shoulder_z),
            ..Trs::IDENTITY
        },
    );
    scene.set_trs(
        "J_l_elbow",
        &Trs {
            translation: elbow,
            ..Trs::IDENTITY
        },
    );
}

fn assert_vec_eq(actual: DVec3, expected: DVec3) {
    assert!(
        actual.abs_diff_eq(expected, EPSILON),
        "expected {expected:?}, got {actual:?}"
    );
}

// ============================================================================
// Solvers
// ============================================================================

#[test]
fn created_solver_is_current_and_editing() -> Result<()> {
    let mut session = session()?;

    let solver = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder"])?;

    assert_eq!(session.current_solver(), Some(solver));
    assert!(session.is_editing(solver)?);
    assert_eq!(session.network().pose_names(solver)?, vec!["default".to_owned()]);
    Ok(())
}

#[test]
fn created_solver_takes_configured_defaults() -> Result<()> {
    init_logger();
    let settings = Settings {
        default_solver: SolverDefaults {
            radius: 20.0,
            automatic_radius: true,
            ..SolverDefaults::default()
        },
        ..Settings::default()
    };
    let mut session = Session::with_settings(arm_scene()?, settings)?;

    let solver = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder"])?;

    let config = session.network().solver(solver).unwrap().config();
    assert!((config.radius - 20.0).abs() < EPSILON);
    assert!(config.automatic_radius);
    Ok(())
}

#[test]
fn failed_creation_leaves_nothing_behind() -> Result<()> {
    let mut session = session()?;

    let result = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder", "J_l_missing"]);

    assert!(matches!(result, Err(PoseWranglerError::TransformNotFound(_))));
    assert!(session.network().is_empty());
    assert_eq!(session.current_solver(), None);
    Ok(())
}

#[test]
fn deleting_current_solver_clears_it() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;

    session.delete_solver(solver)?;

    assert_eq!(session.current_solver(), None);
    assert!(session.get_context().solvers.is_empty());
    assert!(matches!(session.require_current(), Err(PoseWranglerError::NoCurrentSolver)));
    Ok(())
}

#[test]
fn select_solver_by_name() -> Result<()> {
    let mut session = session()?;
    let first = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder"])?;
    session.create_solver("wrist_l_UERBFSolver", &["J_l_wrist"])?;

    assert_eq!(session.select_solver("arm_l_UERBFSolver")?, first);
    assert_eq!(session.current_solver(), Some(first));
    assert!(matches!(
        session.select_solver("nope"),
        Err(PoseWranglerError::SolverNotFound(_))
    ));
    Ok(())
}

#[test]
fn add_drivers_recaptures_default() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;

    session.add_drivers(solver, &["J_l_wrist"])?;

    let default = session.pose(solver, "default")?;
    assert_eq!(default.driver_matrices.len(), 2);
    assert_eq!(session.network().num_poses(solver)?, 1);

    session.create_pose(solver, "raised")?;
    assert!(matches!(
        session.add_drivers(solver, &["J_r_shoulder"]),
        Err(PoseWranglerError::PoseIndexInvalid { .. })
    ));
    Ok(())
}

#[test]
fn rejected_drivers_leave_solver_untouched() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;
    let unchanged = |session: &Session<MemoryScene>| -> Result<()> {
        assert_eq!(session.network().pose_names(solver)?, vec!["default".to_owned()]);
        let drivers = session.network().solver(solver).expect("solver").driver_names();
        assert_eq!(drivers, vec!["J_l_shoulder".to_owned()]);
        Ok(())
    };

    assert!(matches!(
        session.add_drivers(solver, &["J_l_shoulder"]),
        Err(PoseWranglerError::DuplicateDriver { .. })
    ));
    unchanged(&session)?;

    assert!(matches!(
        session.add_drivers(solver, &["J_l_wrist", "nope"]),
        Err(PoseWranglerError::TransformNotFound(name)) if name == "nope"
    ));
    unchanged(&session)?;

    assert!(matches!(
        session.add_drivers(solver, &["J_l_wrist", "J_l_wrist"]),
        Err(PoseWranglerError::DuplicateDriver { driver, .. }) if driver == "J_l_wrist"
    ));
    unchanged(&session)?;

    // The solver still takes a valid driver afterwards.
    session.add_drivers(solver, &["J_l_wrist"])?;
    assert_eq!(session.pose(solver, "default")?.driver_matrices.len(), 2);
    Ok(())
}

#[test]
fn driven_added_while_editing_starts_in_edit() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;

    let (_, blender) = session.network().blender_for("J_l_elbow").expect("bound");
    assert!(blender.edit());

    session.edit_solver(solver, false)?;
    let (_, blender) = session.network().blender_for("J_l_elbow").expect("bound");
    assert!(!blender.edit());
    Ok(())
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn observers_receive_context_after_mutations() -> Result<()> {
    let mut session = session()?;
    let seen: Rc<RefCell<Vec<Context>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let handle = session.subscribe(move |context| sink.borrow_mut().push(context.clone()));

    let solver = session.create_solver("arm_l_UERBFSolver", &["J_l_shoulder"])?;
    {
        let seen = seen.borrow();
        let last = seen.last().expect("notified");
        assert_eq!(last.current_solver, Some(solver));
        assert_eq!(last.solvers, vec![solver]);
        assert_eq!(last.editing, Some(solver));
    }

    // Moving the scene is not a network mutation.
    let count = seen.borrow().len();
    session.go_to_pose(solver, "default")?;
    assert_eq!(seen.borrow().len(), count);

    assert!(session.unsubscribe(handle));
    session.edit_solver(solver, false)?;
    assert_eq!(seen.borrow().len(), count);
    assert!(!session.unsubscribe(handle));
    Ok(())
}

// ============================================================================
// Mirroring & files
// ============================================================================

#[test]
fn mirror_through_session() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;
    session.edit_solver(solver, false)?;

    let mirrored = session.mirror_solver(solver, true)?;

    assert_eq!(session.network().solver(mirrored).unwrap().name(), "arm_r_UERBFSolver");
    assert_eq!(session.get_context().solvers.len(), 2);
    Ok(())
}

#[test]
fn missing_mapping_file_is_invalid_mapping() -> Result<()> {
    let mut session = session()?;

    assert!(matches!(
        session.set_mirror_mapping("/nonexistent/mapping.json"),
        Err(PoseWranglerError::InvalidMirrorMapping(_))
    ));
    assert_eq!(session.settings().mirror_mapping_file, None);
    Ok(())
}

#[test]
fn mapping_file_becomes_active() -> Result<()> {
    let mut session = session()?;
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string(&MirrorMappingDocument::metahuman())?.as_bytes())?;

    session.set_mirror_mapping(file.path())?;

    assert_eq!(session.mirror_mapping().file_path(), Some(file.path()));
    assert_eq!(session.settings().mirror_mapping_file.as_deref(), Some(file.path()));
    Ok(())
}

#[test]
fn settings_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");
    let settings = Settings {
        bake_start_frame: 100,
        ..Settings::default()
    };

    settings.save(&path)?;

    assert_eq!(Settings::load(&path)?, settings);
    assert!(matches!(
        Settings::load(dir.path().join("missing.json")),
        Err(PoseWranglerError::Io { .. })
    ));
    Ok(())
}

#[test]
fn session_file_round_trip() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;
    pose_arm(&mut session, 45.0, DVec3::new(10.0, 4.0, 0.0));
    session.create_pose(solver, "raised")?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("solvers.json");

    session.serialize_to_file(&[], &path)?;
    session.delete_solver(solver)?;
    let loaded = session.deserialize_from_file(&path, None)?;

    assert_eq!(loaded.len(), 1);
    assert_eq!(
        session.network().pose_names(loaded[0])?,
        vec!["default".to_owned(), "raised".to_owned()]
    );
    Ok(())
}

// ============================================================================
// Extensions
// ============================================================================

#[test]
fn unregistered_extension_is_reported() -> Result<()> {
    let mut session = session()?;

    assert!(matches!(
        session.execute_extension::<BakePoses>(),
        Err(PoseWranglerError::ExtensionNotFound(_))
    ));
    Ok(())
}

#[test]
fn extensions_need_a_current_solver() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| ZeroDefaultPose);

    assert_eq!(session.extension_names(), vec!["Zero Default Pose"]);
    assert!(matches!(
        session.execute_extension::<ZeroDefaultPose>(),
        Err(PoseWranglerError::NoCurrentSolver)
    ));
    Ok(())
}

#[test]
fn paste_without_copy_fails() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| CopyPasteTrs::new());

    let result = session.with_extension::<CopyPasteTrs, _>(|clipboard, session| clipboard.paste_driven(session, 1.0));

    assert!(matches!(result, Err(PoseWranglerError::NothingCopied)));
    Ok(())
}

#[test]
fn paste_scales_copied_values() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| CopyPasteTrs::new());
    arm_solver(&mut session)?;
    pose_arm(&mut session, 40.0, DVec3::new(10.0, 4.0, 0.0));
    session.scene_mut().set_trs(
        "J_l_elbow",
        &Trs {
            translation: DVec3::new(10.0, 4.0, 0.0),
            scale: DVec3::splat(2.0),
            ..Trs::IDENTITY
        },
    );

    session.execute_extension::<CopyPasteTrs>()?;
    assert!(session.extension::<CopyPasteTrs>().is_some_and(CopyPasteTrs::has_driven_data));
    session.with_extension::<CopyPasteTrs, _>(|clipboard, session| {
        clipboard.paste_driven(session, 0.5)?;
        clipboard.paste_driver(session, 0.5)
    })?;

    let elbow = session.scene().trs("J_l_elbow").unwrap();
    assert_vec_eq(elbow.translation, DVec3::new(5.0, 2.0, 0.0));
    assert_vec_eq(elbow.scale, DVec3::splat(1.5));
    let shoulder = session.scene().trs("J_l_shoulder").unwrap();
    assert_vec_eq(shoulder.rotation, DVec3::new(0.0, 0.0, 20.0));
    assert_vec_eq(shoulder.translation, DVec3::ZERO);
    Ok(())
}

#[test]
fn inbetweens_step_towards_zero() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| CopyPasteTrs::new());
    session.register_extension(|_| GenerateInbetweens::new(3, "raise"));
    let solver = arm_solver(&mut session)?;
    pose_arm(&mut session, 40.0, DVec3::new(10.0, 8.0, 0.0));

    session.execute_extension::<GenerateInbetweens>()?;

    assert_eq!(
        session.network().pose_names(solver)?,
        vec!["default", "raise_0", "raise_1", "raise_2"]
    );
    let first = session.pose(solver, "raise_0")?;
    assert_vec_eq(Trs::from_matrix(&first.driver_matrices[0]).rotation, DVec3::new(0.0, 0.0, 30.0));
    let elbow = Trs::from_matrix(first.driven_matrix("J_l_elbow").unwrap());
    assert_vec_eq(elbow.translation, DVec3::new(7.5, 6.0, 0.0));
    let last = session.pose(solver, "raise_2")?;
    assert_vec_eq(Trs::from_matrix(&last.driver_matrices[0]).rotation, DVec3::new(0.0, 0.0, 10.0));
    Ok(())
}

#[test]
fn inbetweens_need_the_clipboard() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| GenerateInbetweens::default());
    arm_solver(&mut session)?;

    assert!(matches!(
        session.execute_extension::<GenerateInbetweens>(),
        Err(PoseWranglerError::ExtensionNotFound(_))
    ));
    Ok(())
}

#[test]
fn bake_keys_one_frame_per_pose() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;
    pose_arm(&mut session, 45.0, DVec3::new(10.0, 4.0, 0.0));
    session.create_pose(solver, "raised")?;

    let baked = BakePoses::bake(&mut session, solver, 10)?;

    assert_eq!(baked.poses, vec!["default", "raised"]);
    assert_eq!((baked.start_frame, baked.end_frame), (10, 11));
    let at = |frame: f64| Trs::from_matrix(&baked.clip.sample_matrix("J_l_elbow", frame).unwrap());
    assert_vec_eq(at(10.0).translation, DVec3::new(10.0, 0.0, 0.0));
    assert_vec_eq(at(11.0).translation, DVec3::new(10.0, 4.0, 0.0));
    assert_vec_eq(at(12.0).translation, DVec3::new(10.0, 0.0, 0.0));
    let shoulder = Trs::from_matrix(&baked.clip.sample_matrix("J_l_shoulder", 11.0).unwrap());
    assert_vec_eq(shoulder.rotation, DVec3::new(0.0, 0.0, 45.0));
    Ok(())
}

#[test]
fn bake_extension_uses_configured_start_frame() -> Result<()> {
    let mut session = session()?;
    session.register_extension(|_| BakePoses::new());
    session.settings_mut().bake_start_frame = 5;
    arm_solver(&mut session)?;

    session.execute_extension::<BakePoses>()?;

    let baked = session.extension::<BakePoses>().and_then(BakePoses::last).expect("baked");
    assert_eq!((baked.start_frame, baked.end_frame), (5, 5));
    Ok(())
}

#[test]
fn zero_default_pose_resets_driven() -> Result<()> {
    let mut session = session()?;
    let solver = arm_solver(&mut session)?;
    let shoulder = DMat4::from_quat(euler_degrees_to_quat(DVec3::new(0.0, 0.0, 45.0)));
    session.scene_mut().set_local_matrix("J_l_shoulder", shoulder);
    session.create_pose(solver, "raised")?;

    ZeroDefaultPose::zero(&mut session, solver)?;

    let default = session.pose(solver, "default")?;
    assert!(default.driven_matrix("J_l_elbow").unwrap().abs_diff_eq(DMat4::IDENTITY, EPSILON));
    assert!(session.is_editing(solver)?);
    Ok(())
}
