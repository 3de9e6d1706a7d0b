//! Conversion between a [`PoseNetwork`] and [`Document`]s.

use std::path::Path;

use glam::DMat4;

use crate::errors::{PoseWranglerError, Result};
use crate::math::{from_flat, to_flat};
use crate::network::{PoseNetwork, PoseSample, SolverHandle};
use crate::scene::SceneGraph;
use crate::serialization::document::{BlendshapeDocument, Document, OrderedPoses, PoseDocument, SolverDocument};

// ============================================================================
// Network -> document
// ============================================================================

pub fn serialize_solver(network: &PoseNetwork, handle: SolverHandle) -> Result<SolverDocument> {
    let solver = network
        .solver(handle)
        .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{handle:?}")))?;

    let poses = network
        .poses(handle)?
        .into_iter()
        .map(|pose| {
            let document = PoseDocument {
                drivers: pose.driver_matrices.iter().map(to_flat).collect(),
                controllers: pose.controller_matrices.iter().map(to_flat).collect(),
                driven: pose.driven.iter().map(|(name, m)| (name.clone(), to_flat(m))).collect(),
                function_type: pose.overrides.function_type,
                distance_method: pose.overrides.distance_method,
                scale_factor: pose.overrides.scale_factor,
                target_enable: pose.enabled,
                blendshape_data: pose
                    .blendshape
                    .iter()
                    .map(|b| BlendshapeDocument {
                        mesh: b.mesh.clone(),
                        base_mesh: b.base_mesh.clone(),
                    })
                    .collect(),
            };
            (pose.name, document)
        })
        .collect();

    Ok(SolverDocument {
        drivers: solver.driver_names(),
        driven_transforms: network.driven_nodes(handle)?,
        controllers: solver.controllers().to_vec(),
        poses: OrderedPoses(poses),
        driven_attrs: solver.blendshapes().iter().map(|b| b.mesh.clone()).collect(),
        config: solver.config().clone(),
    })
}

/// Serializes the given solvers, keyed by name.
pub fn serialize(network: &PoseNetwork, solvers: &[SolverHandle]) -> Result<Document> {
    solvers
        .iter()
        .map(|handle| {
            let name = network
                .solver(*handle)
                .map(|s| s.name().to_owned())
                .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{handle:?}")))?;
            Ok((name, serialize_solver(network, *handle)?))
        })
        .collect()
}

/// Serializes every solver in the network.
pub fn serialize_all(network: &PoseNetwork) -> Result<Document> {
    let handles: Vec<_> = network.solvers().into_iter().map(|(h, _)| h).collect();
    serialize(network, &handles)
}

// ============================================================================
// Document -> network
// ============================================================================

/// Reorders document matrices to follow the solver's input order.
///
/// Falls back to document order when a name is missing, leaving the arity
/// check to report the mismatch.
fn align(solver_names: &[String], document_names: &[String], matrices: &[[f64; 16]]) -> Vec<DMat4> {
    let aligned: Option<Vec<DMat4>> = solver_names
        .iter()
        .map(|name| {
            let index = document_names.iter().position(|n| n == name)?;
            matrices.get(index).map(from_flat)
        })
        .collect();
    aligned.unwrap_or_else(|| matrices.iter().map(from_flat).collect())
}

/// Loads solver entries into the network.
///
/// Each selected entry creates its solver or reuses the one with the same
/// name. Missing drivers, controllers and driven transforms are added, poses
/// are added or updated in place by name, then the configuration is applied.
/// `filter` restricts loading to the named solvers.
///
/// A solver created by this call is removed again if loading it fails.
pub fn deserialize(
    network: &mut PoseNetwork,
    scene: &dyn SceneGraph,
    document: &Document,
    filter: Option<&[&str]>,
) -> Result<Vec<SolverHandle>> {
    let mut loaded = Vec::new();
    for (name, entry) in document {
        if filter.is_some_and(|names| !names.contains(&name.as_str())) {
            continue;
        }
        let (handle, created) = match network.find_solver(name) {
            Some(handle) => (handle, false),
            None => (network.create_solver(name)?, true),
        };
        if let Err(err) = load_solver(network, scene, handle, entry) {
            log::error!("Failed to load solver '{name}': {err}");
            if created {
                network.delete_solver(handle)?;
            }
            return Err(err);
        }
        log::info!("Loaded solver '{name}' with {} poses", entry.poses.len());
        loaded.push(handle);
    }
    Ok(loaded)
}

fn load_solver(
    network: &mut PoseNetwork,
    scene: &dyn SceneGraph,
    handle: SolverHandle,
    entry: &SolverDocument,
) -> Result<()> {
    for driver in &entry.drivers {
        if !network.solver_ref(handle)?.has_driver(driver) {
            network.add_driver(handle, driver, scene)?;
        }
    }
    for controller in &entry.controllers {
        if !network.solver_ref(handle)?.has_controller(controller) {
            network.add_controller(handle, controller, scene)?;
        }
    }
    let bound = network.driven_nodes(handle)?;
    let missing: Vec<&str> = entry
        .driven_transforms
        .iter()
        .filter(|t| !bound.contains(t))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        network.add_driven_transforms(handle, &missing, false, scene)?;
    }

    let (drivers, controllers) = {
        let solver = network.solver_ref(handle)?;
        (solver.driver_names(), solver.controllers().to_vec())
    };
    for (pose_name, pose) in entry.poses.iter() {
        let mut sample = PoseSample::new(align(&drivers, &entry.drivers, &pose.drivers))
            .with_controllers(align(&controllers, &entry.controllers, &pose.controllers))
            .with_overrides(pose.overrides())
            .with_enabled(pose.target_enable);
        for (transform, matrix) in &pose.driven {
            sample = sample.with_driven(transform.clone(), from_flat(matrix));
        }
        if let Some(blendshape) = pose.blendshape_data.first() {
            sample.blendshape = Some((blendshape.mesh.clone(), blendshape.base_mesh.clone()));
        }
        network.upsert_pose(handle, pose_name, sample, scene)?;
    }

    network.solver_entry(handle)?.config = entry.config.clone();
    Ok(())
}

// ============================================================================
// JSON and files
// ============================================================================

pub fn to_json_string(document: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn from_json_str(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_document(path: impl AsRef<Path>, document: &Document) -> Result<()> {
    let path = path.as_ref();
    let json = to_json_string(document)?;
    std::fs::write(path, json).map_err(|e| PoseWranglerError::io(path, e))?;
    log::info!("Wrote {} solvers to '{}'", document.len(), path.display());
    Ok(())
}

pub fn read_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| PoseWranglerError::io(path, e))?;
    from_json_str(&json)
}

/// Serializes the given solvers straight to a pretty-printed JSON file.
pub fn serialize_to_file(network: &PoseNetwork, solvers: &[SolverHandle], path: impl AsRef<Path>) -> Result<()> {
    write_document(path, &serialize(network, solvers)?)
}

pub fn deserialize_from_file(
    network: &mut PoseNetwork,
    scene: &dyn SceneGraph,
    path: impl AsRef<Path>,
    filter: Option<&[&str]>,
) -> Result<Vec<SolverHandle>> {
    let document = read_document(path)?;
    deserialize(network, scene, &document, filter)
}
