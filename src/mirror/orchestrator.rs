//! Builds the bilateral counterpart of a solver.

use crate::errors::{PoseWranglerError, Result};
use crate::math::{mirror_driver_trs, mirror_trs};
use crate::mirror::mapping::MirrorMapping;
use crate::network::{DEFAULT_POSE, PoseNetwork, PoseRef, SolverHandle};
use crate::scene::SceneGraph;

/// Source/target name pairs derived from one solver.
#[derive(Debug, Clone)]
struct MirrorPlan {
    source_name: String,
    target_name: String,
    drivers: Vec<(String, String)>,
    controllers: Vec<(String, String)>,
    driven: Vec<(String, String)>,
}

impl MirrorPlan {
    fn build(
        network: &PoseNetwork,
        scene: &dyn SceneGraph,
        source: SolverHandle,
        mapping: &mut MirrorMapping,
    ) -> Result<Self> {
        let solver = network.solver_ref(source)?;
        let source_name = solver.name().to_owned();
        let target_name = mapping.mirror_solver_name(&source_name)?;
        if target_name == source_name {
            return Err(PoseWranglerError::invalid_mirror_mapping(format!(
                "solver '{source_name}' mirrors onto itself"
            )));
        }

        let pair = |names: Vec<String>| -> Result<Vec<(String, String)>> {
            let mirrored = mapping.mirror_transform_names(&names, scene, false)?;
            Ok(names.into_iter().zip(mirrored).collect())
        };
        let drivers = pair(solver.driver_names())?;
        let controllers = pair(solver.controllers().to_vec())?;
        let driven = pair(network.driven_nodes(source)?)?;

        if !solver.blendshapes().is_empty() {
            log::info!(
                "Solver '{source_name}' has {} blendshapes; sculpt meshes are not mirrored",
                solver.blendshapes().len()
            );
        }

        Ok(Self {
            source_name,
            target_name,
            drivers,
            controllers,
            driven,
        })
    }
}

/// Creates (or recreates) the mirror of `source`.
///
/// Any solver already carrying the mirrored name is deleted first. With
/// `mirror_poses` every source pose is reflected onto the target's transforms
/// and recorded under the same name, after which all solvers return to their
/// "default" pose. Otherwise the target only captures "default" from its
/// current transforms.
///
/// A target left half-built by a failure is deleted again.
pub fn mirror_solver(
    network: &mut PoseNetwork,
    scene: &mut dyn SceneGraph,
    source: SolverHandle,
    mapping: &mut MirrorMapping,
    mirror_poses: bool,
) -> Result<SolverHandle> {
    let plan = MirrorPlan::build(network, scene, source, mapping)?;

    if let Some(existing) = network.find_solver(&plan.target_name) {
        log::info!("Replacing existing solver '{}'", plan.target_name);
        network.delete_solver(existing)?;
    }
    let target = network.create_solver(&plan.target_name)?;

    match populate(network, scene, source, target, &plan, mirror_poses) {
        Ok(()) => {
            log::info!("Mirrored solver '{}' to '{}'", plan.source_name, plan.target_name);
            Ok(target)
        }
        Err(err) => {
            log::error!("Mirroring '{}' failed, removing '{}': {err}", plan.source_name, plan.target_name);
            network.delete_solver(target)?;
            Err(err)
        }
    }
}

fn populate(
    network: &mut PoseNetwork,
    scene: &mut dyn SceneGraph,
    source: SolverHandle,
    target: SolverHandle,
    plan: &MirrorPlan,
    mirror_poses: bool,
) -> Result<()> {
    let config = network.solver_ref(source)?.config().clone();
    network.solver_entry(target)?.config = config;

    for (_, driver) in &plan.drivers {
        network.add_driver(target, driver, scene)?;
    }
    for (_, controller) in &plan.controllers {
        network.add_controller(target, controller, scene)?;
    }
    let driven: Vec<&str> = plan.driven.iter().map(|(_, t)| t.as_str()).collect();
    network.add_driven_transforms(target, &driven, false, scene)?;

    if mirror_poses {
        for pose in network.pose_names(source)? {
            mirror_pose_onto(network, scene, source, target, plan, &pose)?;
        }
        network.go_to_default_all(scene, None)?;
    } else if !plan.drivers.is_empty() {
        network.add_pose_from_current(target, DEFAULT_POSE, scene)?;
    }
    Ok(())
}

/// Mirrors a single pose onto the counterpart solver, creating the
/// counterpart (without poses) if it does not exist yet.
///
/// The pose is added to the target, or updated in place when the target
/// already has a pose of that name.
pub fn mirror_pose(
    network: &mut PoseNetwork,
    scene: &mut dyn SceneGraph,
    source: SolverHandle,
    pose: &str,
    mapping: &mut MirrorMapping,
) -> Result<SolverHandle> {
    network.resolve_pose(source, PoseRef::Name(pose))?;
    network.go_to_default_all(scene, Some(source))?;

    let plan = MirrorPlan::build(network, scene, source, mapping)?;
    let target = match network.find_solver(&plan.target_name) {
        Some(target) => target,
        None => mirror_solver(network, scene, source, mapping, false)?,
    };
    mirror_pose_onto(network, scene, source, target, &plan, pose)?;
    Ok(target)
}

fn mirror_pose_onto(
    network: &mut PoseNetwork,
    scene: &mut dyn SceneGraph,
    source: SolverHandle,
    target: SolverHandle,
    plan: &MirrorPlan,
    pose: &str,
) -> Result<()> {
    let source_pose = network.pose(source, pose)?;
    network.go_to_pose(source, pose, scene)?;

    for (from, to) in plan.drivers.iter().chain(&plan.controllers) {
        mirror_input(scene, from, to)?;
    }
    for (from, to) in &plan.driven {
        mirror_driven(scene, from, to)?;
    }

    // Hold the target's bindings in edit so the recorded values are the ones
    // just written, then put them back as they were.
    let was_editing = network.editing_solver() == Some(target);
    network.set_bindings_edit(target, true)?;
    let recorded = network.capture_sample(target, scene).and_then(|sample| {
        let sample = sample
            .with_overrides(source_pose.overrides)
            .with_enabled(source_pose.enabled);
        network.upsert_pose(target, pose, sample, scene)
    });
    network.set_bindings_edit(target, was_editing)?;
    recorded?;

    log::debug!("Mirrored pose '{pose}' from '{}' to '{}'", plan.source_name, plan.target_name);
    Ok(())
}

/// Drivers and controllers: rotation and scale are reflected, the target keeps
/// its own translation.
fn mirror_input(scene: &mut dyn SceneGraph, from: &str, to: &str) -> Result<()> {
    let source = scene
        .trs(from)
        .ok_or_else(|| PoseWranglerError::StaleReference(from.to_owned()))?;
    let current = scene
        .trs(to)
        .ok_or_else(|| PoseWranglerError::StaleReference(to.to_owned()))?;
    let mirrored = mirror_driver_trs(
        &scene.require_parent_matrix(from)?,
        &scene.require_parent_matrix(to)?,
        &source,
        current.translation,
    );
    scene.set_trs(to, &mirrored);
    Ok(())
}

fn mirror_driven(scene: &mut dyn SceneGraph, from: &str, to: &str) -> Result<()> {
    let Some(source) = scene.trs(from) else {
        log::warn!("Driven '{from}' no longer exists; '{to}' is left as is");
        return Ok(());
    };
    let mirrored = mirror_trs(
        &scene.require_parent_matrix(from)?,
        &scene.require_parent_matrix(to)?,
        &source,
    );
    if !scene.set_trs(to, &mirrored) {
        log::warn!("Mirrored driven '{to}' no longer exists");
    }
    Ok(())
}
