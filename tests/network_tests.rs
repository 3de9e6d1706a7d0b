//! Pose Network Tests
//!
//! Tests for:
//! - Driver, controller and driven binding bookkeeping
//! - Pose add/update/delete/rename/mute and the arity rules
//! - Lockstep between solver poses and driven bindings
//! - go_to_pose, edit mode registry and evaluation plumbing
//! - Skipping transforms deleted from the scene
//! - Blendshape bindings

use anyhow::Result;
use glam::{DMat4, DQuat, DVec3};

use pose_wrangler::math::euler_degrees_to_quat;
use pose_wrangler::network::{EvaluationInput, PoseOverrides, PoseSample, RbfEvaluator};
use pose_wrangler::network::{DistanceMethod, FunctionType};
use pose_wrangler::{MemoryScene, PoseNetwork, PoseRef, PoseWranglerError, SceneGraph, SolverHandle};

const EPSILON: f64 = 1e-9;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rot_z(degrees: f64) -> DMat4 {
    DMat4::from_quat(euler_degrees_to_quat(DVec3::new(0.0, 0.0, degrees)))
}

fn elbow_rest() -> DMat4 {
    DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0))
}

fn elbow_raised() -> DMat4 {
    DMat4::from_translation(DVec3::new(10.0, 4.0, 0.0))
}

fn arm_scene() -> Result<MemoryScene> {
    let mut scene = MemoryScene::new();
    let shoulder = scene.add("J_l_shoulder", None)?;
    scene.add("J_l_elbow", Some(shoulder))?;
    scene.add("J_l_wrist", None)?;
    scene.add("J_l_hand", None)?;
    scene.add("body", None)?;
    scene.set_local_matrix("J_l_elbow", elbow_rest());
    Ok(scene)
}

/// Driver `J_l_shoulder`, driven `J_l_elbow`, poses "default" and "raised".
fn scenario_a() -> Result<(PoseNetwork, MemoryScene, SolverHandle)> {
    init_logger();
    let mut scene = arm_scene()?;
    let mut network = PoseNetwork::new();
    let solver = network.create_solver("arm_l_UERBFSolver")?;

    network.add_driver(solver, "J_l_shoulder", &scene)?;
    network.add_pose(solver, "default", PoseSample::new(vec![DMat4::IDENTITY]), &scene)?;
    network.add_driven_transforms(solver, &["J_l_elbow"], false, &scene)?;
    network.add_pose(
        solver,
        "raised",
        PoseSample::new(vec![rot_z(45.0)]).with_driven("J_l_elbow", elbow_raised()),
        &scene,
    )?;
    network.go_to_pose(solver, "default", &mut scene)?;
    Ok((network, scene, solver))
}

struct FixedWeights(Vec<f64>);

impl RbfEvaluator for FixedWeights {
    fn evaluate(&self, _input: &EvaluationInput<'_>) -> Vec<f64> {
        self.0.clone()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_a_builds_two_poses_with_one_driven() -> Result<()> {
    let (network, _, solver) = scenario_a()?;

    assert_eq!(network.num_poses(solver)?, 2);
    assert_eq!(network.driven_nodes(solver)?, vec!["J_l_elbow".to_owned()]);
    let raised = network.pose(solver, "raised")?;
    assert_eq!(raised.index, 1);
    assert!(raised.driver_matrices[0].abs_diff_eq(rot_z(45.0), EPSILON));
    assert!(raised.driven_matrix("J_l_elbow").is_some_and(|m| m.abs_diff_eq(elbow_raised(), EPSILON)));
    Ok(())
}

#[test]
fn scenario_b_delete_pose_shrinks_bindings() -> Result<()> {
    let (mut network, _, solver) = scenario_a()?;

    network.delete_pose(solver, "raised")?;

    assert_eq!(network.num_poses(solver)?, 1);
    assert!(!network.has_pose(solver, "raised")?);
    let (_, blender) = network.blender_for("J_l_elbow").expect("elbow is bound");
    assert_eq!(blender.num_poses(), 1);
    Ok(())
}

#[test]
fn scenario_c_driver_locked_after_second_pose() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;

    let err = network.add_driver(solver, "J_l_wrist", &scene).unwrap_err();
    assert!(matches!(err, PoseWranglerError::DriverLimitExceeded { num_poses: 2, .. }));
    assert_eq!(network.solver(solver).unwrap().drivers().len(), 1);
    Ok(())
}

// ============================================================================
// Drivers
// ============================================================================

#[test]
fn add_driver_extends_the_only_pose() -> Result<()> {
    init_logger();
    let mut scene = arm_scene()?;
    scene.set_local_matrix("J_l_wrist", rot_z(10.0));
    let mut network = PoseNetwork::new();
    let solver = network.create_solver("arm_l_solver")?;
    network.add_driver(solver, "J_l_shoulder", &scene)?;
    network.add_pose_from_current(solver, "default", &scene)?;

    network.add_driver(solver, "J_l_wrist", &scene)?;

    let pose = network.pose(solver, "default")?;
    assert_eq!(pose.driver_matrices.len(), 2);
    assert!(pose.driver_matrices[1].abs_diff_eq(rot_z(10.0), EPSILON));
    Ok(())
}

#[test]
fn duplicate_and_missing_drivers_are_rejected() -> Result<()> {
    init_logger();
    let scene = arm_scene()?;
    let mut network = PoseNetwork::new();
    let solver = network.create_solver("arm_l_solver")?;
    network.add_driver(solver, "J_l_shoulder", &scene)?;

    assert!(matches!(
        network.add_driver(solver, "J_l_shoulder", &scene),
        Err(PoseWranglerError::DuplicateDriver { .. })
    ));
    assert!(matches!(
        network.add_driver(solver, "nope", &scene),
        Err(PoseWranglerError::TransformNotFound(_))
    ));
    Ok(())
}

#[test]
fn remove_drivers_rebuilds_default_only() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    network.delete_pose(solver, "raised")?;
    network.add_driver(solver, "J_l_wrist", &scene)?;
    network.add_pose(
        solver,
        "bent",
        PoseSample::new(vec![rot_z(30.0), DMat4::IDENTITY]),
        &scene,
    )?;
    scene.set_local_matrix("J_l_shoulder", rot_z(5.0));

    network.remove_drivers(solver, &["J_l_wrist"], &scene)?;

    assert_eq!(network.pose_names(solver)?, vec!["default".to_owned()]);
    let default = network.pose(solver, "default")?;
    assert_eq!(default.driver_matrices.len(), 1);
    assert!(default.driver_matrices[0].abs_diff_eq(rot_z(5.0), EPSILON));
    let (_, blender) = network.blender_for("J_l_elbow").expect("elbow is bound");
    assert_eq!(blender.num_poses(), 1);

    assert!(matches!(
        network.remove_drivers(solver, &["J_l_wrist"], &scene),
        Err(PoseWranglerError::DriverNotFound { .. })
    ));
    Ok(())
}

#[test]
fn remove_no_drivers_keeps_poses() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    scene.set_local_matrix("J_l_shoulder", rot_z(5.0));

    network.remove_drivers(solver, &[], &scene)?;

    assert_eq!(network.pose_names(solver)?, vec!["default".to_owned(), "raised".to_owned()]);
    assert!(network.pose(solver, "default")?.driver_matrices[0].abs_diff_eq(DMat4::IDENTITY, EPSILON));
    assert_eq!(network.blender_for("J_l_elbow").unwrap().1.num_poses(), 2);
    Ok(())
}

// ============================================================================
// Poses
// ============================================================================

#[test]
fn add_pose_with_wrong_arity_changes_nothing() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;

    for matrices in [vec![], vec![DMat4::IDENTITY, DMat4::IDENTITY]] {
        let err = network.add_pose(solver, "bad", PoseSample::new(matrices), &scene).unwrap_err();
        assert!(matches!(err, PoseWranglerError::ArityMismatch { what: "driver", .. }));
    }
    assert_eq!(network.num_poses(solver)?, 2);
    let (_, blender) = network.blender_for("J_l_elbow").expect("elbow is bound");
    assert_eq!(blender.num_poses(), 2);
    Ok(())
}

#[test]
fn add_pose_without_drivers_fails() -> Result<()> {
    init_logger();
    let scene = arm_scene()?;
    let mut network = PoseNetwork::new();
    let solver = network.create_solver("empty")?;

    assert!(matches!(
        network.add_pose(solver, "default", PoseSample::new(vec![]), &scene),
        Err(PoseWranglerError::NoDriver(_))
    ));
    Ok(())
}

#[test]
fn duplicate_pose_name_is_rejected() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;

    let err = network
        .add_pose(solver, "raised", PoseSample::new(vec![DMat4::IDENTITY]), &scene)
        .unwrap_err();
    assert!(matches!(err, PoseWranglerError::DuplicatePose { .. }));
    Ok(())
}

#[test]
fn update_pose_keeps_index() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;

    let index = network.update_pose(
        solver,
        "default",
        PoseSample::new(vec![rot_z(-10.0)]).with_driven("J_l_elbow", elbow_raised()),
        &scene,
    )?;

    assert_eq!(index, 0);
    let pose = network.pose(solver, "default")?;
    assert!(pose.driver_matrices[0].abs_diff_eq(rot_z(-10.0), EPSILON));
    assert!(pose.driven_matrix("J_l_elbow").is_some_and(|m| m.abs_diff_eq(elbow_raised(), EPSILON)));
    assert!(matches!(
        network.update_pose(solver, "missing", PoseSample::new(vec![DMat4::IDENTITY]), &scene),
        Err(PoseWranglerError::PoseNotFound { .. })
    ));
    Ok(())
}

#[test]
fn update_from_current_keeps_overrides_and_mute() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    let overrides = PoseOverrides {
        function_type: FunctionType::Linear,
        distance_method: DistanceMethod::Euclidean,
        scale_factor: 2.0,
    };
    network.add_pose(
        solver,
        "tuned",
        PoseSample::new(vec![rot_z(90.0)]).with_overrides(overrides).with_enabled(false),
        &scene,
    )?;

    scene.set_local_matrix("J_l_shoulder", rot_z(80.0));
    network.update_pose_from_current(solver, "tuned", &scene)?;

    let pose = network.pose(solver, "tuned")?;
    assert_eq!(pose.overrides, overrides);
    assert!(!pose.enabled);
    assert!(pose.driver_matrices[0].abs_diff_eq(rot_z(80.0), EPSILON));
    Ok(())
}

#[test]
fn mute_and_unmute_keep_matrices() -> Result<()> {
    let (mut network, _, solver) = scenario_a()?;
    let before = network.pose(solver, "raised")?;

    assert!(!network.mute_pose(solver, "raised".into(), Some(true))?);
    assert!(network.is_pose_muted(solver, "raised".into())?);
    assert!(network.mute_pose(solver, PoseRef::Index(1), None)?);

    assert!(!network.is_pose_muted(solver, "raised".into())?);
    assert_eq!(network.pose(solver, "raised")?, before);
    Ok(())
}

#[test]
fn rename_pose_by_name_and_index() -> Result<()> {
    let (mut network, _, solver) = scenario_a()?;

    network.rename_pose(solver, "raised".into(), "up")?;
    network.rename_pose(solver, PoseRef::Index(1), "up")?;
    assert_eq!(network.pose_names(solver)?, vec!["default".to_owned(), "up".to_owned()]);

    assert!(matches!(
        network.rename_pose(solver, "up".into(), "default"),
        Err(PoseWranglerError::DuplicatePose { .. })
    ));
    assert!(matches!(
        network.rename_pose(solver, PoseRef::Index(5), "x"),
        Err(PoseWranglerError::PoseIndexInvalid { .. })
    ));
    Ok(())
}

#[test]
fn go_to_pose_writes_inputs_and_driven() -> Result<()> {
    let (network, mut scene, solver) = scenario_a()?;

    network.go_to_pose(solver, "raised", &mut scene)?;
    assert!(scene.local_matrix("J_l_shoulder").unwrap().abs_diff_eq(rot_z(45.0), EPSILON));
    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(elbow_raised(), EPSILON));

    assert!(network.go_to_default(solver, &mut scene)?);
    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(elbow_rest(), EPSILON));
    assert!(matches!(
        network.go_to_pose(solver, "missing", &mut scene),
        Err(PoseWranglerError::PoseNotFound { .. })
    ));
    Ok(())
}

// ============================================================================
// Driven bindings
// ============================================================================

#[test]
fn late_driven_records_every_existing_pose() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    let hand = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
    scene.set_local_matrix("J_l_hand", hand);

    network.add_driven_transforms(solver, &["J_l_hand"], false, &scene)?;

    for pose in network.poses(solver)? {
        assert!(pose.driven_matrix("J_l_hand").is_some_and(|m| m.abs_diff_eq(hand, EPSILON)));
    }
    Ok(())
}

#[test]
fn transform_driven_by_another_solver_is_skipped() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;
    let other = network.create_solver("other_l_solver")?;

    let added = network.add_driven_transforms(other, &["J_l_elbow", "J_l_hand"], false, &scene)?;

    assert_eq!(added.len(), 1);
    assert_eq!(network.driven_nodes(other)?, vec!["J_l_hand".to_owned()]);
    assert_eq!(network.blender_for("J_l_elbow").unwrap().1.solver(), solver);
    Ok(())
}

#[test]
fn remove_and_delete_free_driven_transforms() -> Result<()> {
    let (mut network, scene, solver) = scenario_a()?;

    assert!(matches!(
        network.remove_driven_transforms(solver, &["J_l_hand"]),
        Err(PoseWranglerError::DrivenNotFound { .. })
    ));
    network.remove_driven_transforms(solver, &["J_l_elbow"])?;
    assert!(network.blender_for("J_l_elbow").is_none());

    network.add_driven_transforms(solver, &["J_l_elbow"], false, &scene)?;
    network.delete_solver(solver)?;
    assert!(network.blender_for("J_l_elbow").is_none());
    assert!(network.find_solver("arm_l_UERBFSolver").is_none());
    Ok(())
}

#[test]
fn controllers_replace_drivers_for_matching() -> Result<()> {
    init_logger();
    let mut scene = arm_scene()?;
    let mut network = PoseNetwork::new();
    let solver = network.create_solver("ctrl_l_solver")?;
    network.add_driver(solver, "J_l_shoulder", &scene)?;
    network.add_controller(solver, "J_l_wrist", &scene)?;

    let err = network
        .add_pose(solver, "default", PoseSample::new(vec![DMat4::IDENTITY]), &scene)
        .unwrap_err();
    assert!(matches!(err, PoseWranglerError::ArityMismatch { what: "controller", .. }));

    network.add_pose(
        solver,
        "default",
        PoseSample::new(vec![DMat4::IDENTITY]).with_controllers(vec![rot_z(20.0)]),
        &scene,
    )?;
    assert!(matches!(
        network.add_controller(solver, "J_l_hand", &scene),
        Err(PoseWranglerError::ControllerLimitExceeded { .. })
    ));

    network.go_to_pose(solver, "default", &mut scene)?;
    assert!(scene.local_matrix("J_l_wrist").unwrap().abs_diff_eq(rot_z(20.0), EPSILON));
    Ok(())
}

// ============================================================================
// Edit mode & evaluation
// ============================================================================

#[test]
fn only_one_solver_edits_at_a_time() -> Result<()> {
    let (mut network, mut scene, first) = scenario_a()?;
    let second = network.create_solver("hand_l_solver")?;
    network.add_driven_transforms(second, &["J_l_hand"], false, &scene)?;

    network.edit_solver(first, true, &mut scene)?;
    assert!(network.is_editing(first)?);

    network.edit_solver(second, true, &mut scene)?;
    assert_eq!(network.editing_solver(), Some(second));
    assert!(!network.is_editing(first)?);
    assert!(!network.blender_for("J_l_elbow").unwrap().1.edit());

    network.edit_solver(second, false, &mut scene)?;
    assert_eq!(network.editing_solver(), None);
    Ok(())
}

#[test]
fn driven_added_in_edit_does_not_claim_edit_mode() -> Result<()> {
    let (mut network, mut scene, first) = scenario_a()?;
    let second = network.create_solver("hand_l_solver")?;
    network.edit_solver(first, true, &mut scene)?;

    network.add_driven_transforms(second, &["J_l_hand"], true, &scene)?;

    assert!(network.blender_for("J_l_hand").unwrap().1.edit());
    assert!(network.is_editing(first)?);
    assert!(!network.is_editing(second)?);
    assert_eq!(network.editing_solver(), Some(first));
    Ok(())
}

#[test]
fn entering_edit_sends_others_to_default() -> Result<()> {
    let (mut network, mut scene, first) = scenario_a()?;
    let second = network.create_solver("hand_l_solver")?;
    network.go_to_pose(first, "raised", &mut scene)?;

    network.edit_solver(second, true, &mut scene)?;

    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(elbow_rest(), EPSILON));
    Ok(())
}

#[test]
fn evaluate_blends_onto_driven() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;

    let weights = network.evaluate(solver, &FixedWeights(vec![0.0, 1.0]), &mut scene)?;

    assert_eq!(weights, vec![0.0, 1.0]);
    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(elbow_raised(), 1e-6));
    assert_eq!(network.solver(solver).unwrap().weights(), &[0.0, 1.0]);
    Ok(())
}

#[test]
fn evaluate_zeroes_muted_and_tiny_weights() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    network.mute_pose(solver, "raised".into(), Some(true))?;

    let weights = network.evaluate(solver, &FixedWeights(vec![1e-4, 1.0]), &mut scene)?;

    assert_eq!(weights, vec![0.0, 0.0]);
    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(elbow_rest(), 1e-6));
    Ok(())
}

#[test]
fn evaluate_leaves_edited_driven_alone() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    network.edit_solver(solver, true, &mut scene)?;
    let sculpted = DMat4::from_rotation_translation(DQuat::from_rotation_y(0.3), DVec3::new(9.0, 1.0, 0.0));
    scene.set_local_matrix("J_l_elbow", sculpted);

    network.evaluate(solver, &FixedWeights(vec![0.0, 1.0]), &mut scene)?;

    assert!(scene.local_matrix("J_l_elbow").unwrap().abs_diff_eq(sculpted, EPSILON));
    Ok(())
}

#[test]
fn evaluator_with_wrong_shape_is_rejected() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;

    let err = network
        .evaluate(solver, &FixedWeights(vec![1.0]), &mut scene)
        .unwrap_err();
    assert!(matches!(err, PoseWranglerError::EvaluatorShape { expected: 2, actual: 1 }));
    Ok(())
}

// ============================================================================
// Transforms deleted from the scene
// ============================================================================

#[test]
fn deleted_driven_is_skipped() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    assert!(scene.delete("J_l_elbow"));

    network.go_to_pose(solver, "raised", &mut scene)?;
    assert!(scene.local_matrix("J_l_shoulder").unwrap().abs_diff_eq(rot_z(45.0), EPSILON));
    assert!(!scene.exists("J_l_elbow"));

    // A new pose falls back to the binding's base pose.
    let index = network.add_pose_from_current(solver, "bent", &scene)?;
    let (_, blender) = network.blender_for("J_l_elbow").expect("binding survives");
    assert_eq!(blender.num_poses(), 3);
    assert!(blender.pose(index).is_some_and(|m| m.abs_diff_eq(elbow_rest(), EPSILON)));

    let weights = network.evaluate(solver, &FixedWeights(vec![0.0, 1.0, 0.0]), &mut scene)?;
    assert_eq!(weights, vec![0.0, 1.0, 0.0]);
    assert!(!scene.exists("J_l_elbow"));
    assert_eq!(network.solver(solver).unwrap().weights(), &[0.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn deleted_driver_is_a_stale_reference() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    assert!(scene.delete("J_l_shoulder"));

    network.go_to_pose(solver, "raised", &mut scene)?;

    let err = network
        .evaluate(solver, &FixedWeights(vec![0.0, 1.0]), &mut scene)
        .unwrap_err();
    assert!(matches!(err, PoseWranglerError::StaleReference(ref name) if name == "J_l_shoulder"));
    assert!(network.solver(solver).unwrap().weights().iter().all(|w| *w == 0.0));

    assert!(matches!(
        network.add_pose_from_current(solver, "bent", &scene),
        Err(PoseWranglerError::StaleReference(_))
    ));
    assert_eq!(network.num_poses(solver)?, 2);
    Ok(())
}

// ============================================================================
// Blendshapes
// ============================================================================

#[test]
fn blendshape_weights_follow_poses() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;

    let mesh = network.create_blendshape(solver, "raised", "body", None, &mut scene)?;
    assert_eq!(mesh, "raised_body");
    assert!(scene.exists("raised_body"));

    network.evaluate(solver, &FixedWeights(vec![0.0, 0.75]), &mut scene)?;
    assert_eq!(network.blendshape_weights(solver)?, vec![("raised_body".to_owned(), 0.75)]);

    network.isolate_blendshape(solver, "raised", true)?;
    assert_eq!(network.blendshape_weights(solver)?, vec![("raised_body".to_owned(), 1.0)]);

    assert!(matches!(
        network.create_blendshape(solver, "raised", "body", None, &mut scene),
        Err(PoseWranglerError::Blendshape(_))
    ));
    Ok(())
}

#[test]
fn deleting_pose_unbinds_its_blendshape() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    network.create_blendshape(solver, "raised", "body", Some("sculpt"), &mut scene)?;

    network.delete_pose(solver, "raised")?;

    assert!(network.solver(solver).unwrap().blendshapes().is_empty());
    assert!(network.solver(solver).unwrap().isolated_blendshape().is_none());
    Ok(())
}

#[test]
fn delete_blendshape_can_remove_mesh() -> Result<()> {
    let (mut network, mut scene, solver) = scenario_a()?;
    network.create_blendshape(solver, "raised", "body", None, &mut scene)?;

    assert!(network.delete_blendshape(solver, "raised", true, &mut scene)?);
    assert!(!scene.exists("raised_body"));
    assert!(!network.delete_blendshape(solver, "raised", true, &mut scene)?);
    Ok(())
}
