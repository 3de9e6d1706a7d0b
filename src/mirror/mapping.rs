//! Naming-convention configuration for left/right mirroring.
//!
//! A mapping document looks like:
//!
//! ```json
//! {
//!     "solver_expression": "(?P<prefix>[a-zA-Z0-9]+)?(?P<side>_[lr]{1}_)(?P<suffix>[a-zA-Z0-9]+)",
//!     "transform_expression": "(?P<prefix>[a-zA-Z0-9]+)?(?P<side>_[lr]{1}_)(?P<suffix>[a-zA-Z0-9]+)",
//!     "left": { "solver_syntax": "_l_", "transform_syntax": "_l_" },
//!     "right": { "solver_syntax": "_r_", "transform_syntax": "_r_" }
//! }
//! ```
//!
//! A name is mirrored by matching it against the expression (anchored at the
//! start) and concatenating the capture groups, with any group equal to one
//! side's syntax token replaced by the other side's.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{PoseWranglerError, Result};
use crate::scene::SceneGraph;

const METAHUMAN_EXPRESSION: &str = "(?P<prefix>[a-zA-Z0-9]+)?(?P<side>_[lr]{1}_)(?P<suffix>[a-zA-Z0-9]+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl FromStr for Side {
    type Err = PoseWranglerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(PoseWranglerError::InvalidSide(other.to_owned())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Syntax tokens identifying one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSyntax {
    pub solver_syntax: String,
    pub transform_syntax: String,
}

/// On-disk form of a [`MirrorMapping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMappingDocument {
    pub solver_expression: String,
    pub transform_expression: String,
    pub left: SideSyntax,
    pub right: SideSyntax,
}

impl MirrorMappingDocument {
    /// MetaHuman conventions: `_l_` / `_r_` for both solvers and joints.
    #[must_use]
    pub fn metahuman() -> Self {
        Self {
            solver_expression: METAHUMAN_EXPRESSION.to_owned(),
            transform_expression: METAHUMAN_EXPRESSION.to_owned(),
            left: SideSyntax {
                solver_syntax: "_l_".to_owned(),
                transform_syntax: "_l_".to_owned(),
            },
            right: SideSyntax {
                solver_syntax: "_r_".to_owned(),
                transform_syntax: "_r_".to_owned(),
            },
        }
    }
}

fn compile(expression: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{expression})")).map_err(|source| PoseWranglerError::InvalidRegex {
        expression: expression.to_owned(),
        source,
    })
}

/// Compiled mirror mapping with a mutable "source side".
///
/// The source side starts as left. Mirroring a solver name from the target
/// side swaps it, so one mapping serves calls issued from either side.
#[derive(Debug, Clone)]
pub struct MirrorMapping {
    document: MirrorMappingDocument,
    solver_regex: Regex,
    transform_regex: Regex,
    source_side: Side,
    file_path: Option<PathBuf>,
}

impl MirrorMapping {
    pub fn from_document(document: MirrorMappingDocument) -> Result<Self> {
        let solver_regex = compile(&document.solver_expression)?;
        let transform_regex = compile(&document.transform_expression)?;
        Ok(Self {
            document,
            solver_regex,
            transform_regex,
            source_side: Side::Left,
            file_path: None,
        })
    }

    /// The built-in MetaHuman mapping.
    pub fn metahuman() -> Result<Self> {
        Self::from_document(MirrorMappingDocument::metahuman())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: MirrorMappingDocument = serde_json::from_str(json)
            .map_err(|e| PoseWranglerError::invalid_mirror_mapping(format!("malformed mapping document: {e}")))?;
        Self::from_document(document)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| PoseWranglerError::io(path, e))?;
        let mut mapping = Self::from_json(&json)?;
        mapping.file_path = Some(path.to_path_buf());
        log::info!("Loaded mirror mapping from '{}'", path.display());
        Ok(mapping)
    }

    #[must_use]
    pub fn document(&self) -> &MirrorMappingDocument {
        &self.document
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    #[must_use]
    pub fn solver_expression(&self) -> &str {
        &self.document.solver_expression
    }

    #[must_use]
    pub fn transform_expression(&self) -> &str {
        &self.document.transform_expression
    }

    // ========================================================================
    // Sides
    // ========================================================================

    #[must_use]
    pub fn source_side(&self) -> Side {
        self.source_side
    }

    #[must_use]
    pub fn target_side(&self) -> Side {
        self.source_side.opposite()
    }

    pub fn set_source_side(&mut self, side: Side) {
        self.source_side = side;
    }

    /// Sets the source side by name (`"left"` / `"right"`).
    pub fn set_source_side_name(&mut self, side: &str) -> Result<()> {
        self.source_side = side.parse()?;
        Ok(())
    }

    pub fn swap_sides(&mut self) {
        self.source_side = self.source_side.opposite();
    }

    fn syntax(&self, side: Side) -> &SideSyntax {
        match side {
            Side::Left => &self.document.left,
            Side::Right => &self.document.right,
        }
    }

    #[must_use]
    pub fn source_solver_syntax(&self) -> &str {
        &self.syntax(self.source_side).solver_syntax
    }

    #[must_use]
    pub fn target_solver_syntax(&self) -> &str {
        &self.syntax(self.target_side()).solver_syntax
    }

    #[must_use]
    pub fn source_transform_syntax(&self) -> &str {
        &self.syntax(self.source_side).transform_syntax
    }

    #[must_use]
    pub fn target_transform_syntax(&self) -> &str {
        &self.syntax(self.target_side()).transform_syntax
    }

    // ========================================================================
    // Name mirroring
    // ========================================================================

    /// Mirrors a solver name.
    ///
    /// If the name carries the target side's token, the sides are swapped so
    /// the following transform lookups run in the same direction.
    pub fn mirror_solver_name(&mut self, name: &str) -> Result<String> {
        let captures = self.solver_regex.captures(name).ok_or_else(|| {
            PoseWranglerError::invalid_mirror_mapping(format!(
                "solver '{name}' does not match the mirror mapping expression: {}",
                self.document.solver_expression
            ))
        })?;

        let source = self.source_solver_syntax().to_owned();
        let target = self.target_solver_syntax().to_owned();
        let mut mirrored = String::with_capacity(name.len());
        let mut swap = false;
        for group in captures.iter().skip(1).flatten() {
            let text = group.as_str();
            if text == source {
                mirrored.push_str(&target);
            } else if text == target {
                mirrored.push_str(&source);
                swap = true;
            } else {
                mirrored.push_str(text);
            }
        }
        if swap {
            self.swap_sides();
        }
        Ok(mirrored)
    }

    /// Mirrors a transform name using the current source side.
    pub fn mirror_transform_name(&self, name: &str) -> Result<String> {
        let captures = self.transform_regex.captures(name).ok_or_else(|| {
            PoseWranglerError::invalid_mirror_mapping(format!(
                "transform '{name}' does not match the mirror mapping expression: {}",
                self.document.transform_expression
            ))
        })?;

        let source = self.source_transform_syntax();
        let target = self.target_transform_syntax();
        Ok(captures
            .iter()
            .skip(1)
            .flatten()
            .map(|group| match group.as_str() {
                text if text == source => target,
                text if text == target => source,
                text => text,
            })
            .collect())
    }

    /// Mirrors several transform names, requiring each result to exist in the
    /// scene unless `ignore_missing` is set.
    pub fn mirror_transform_names(
        &self,
        names: &[String],
        scene: &dyn SceneGraph,
        ignore_missing: bool,
    ) -> Result<Vec<String>> {
        names
            .iter()
            .map(|name| {
                let mirrored = self.mirror_transform_name(name)?;
                if !ignore_missing && !scene.exists(&mirrored) {
                    return Err(PoseWranglerError::invalid_mirror_mapping(format!(
                        "cannot mirror transform '{name}': target '{mirrored}' does not exist"
                    )));
                }
                Ok(mirrored)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_is_anchored_at_start() {
        let mapping = MirrorMapping::metahuman().unwrap();
        assert!(mapping.mirror_transform_name("__l_arm").is_err());
        // Trailing text past the match is dropped, as with a prefix match.
        assert_eq!(mapping.mirror_transform_name("arm_l_up.x").unwrap(), "arm_r_up");
    }

    #[test]
    fn optional_prefix_may_be_absent() {
        let mapping = MirrorMapping::metahuman().unwrap();
        assert_eq!(mapping.mirror_transform_name("_l_clavicle").unwrap(), "_r_clavicle");
    }

    #[test]
    fn invalid_side_name_is_rejected() {
        let mut mapping = MirrorMapping::metahuman().unwrap();
        assert!(matches!(
            mapping.set_source_side_name("middle"),
            Err(PoseWranglerError::InvalidSide(_))
        ));
        mapping.set_source_side_name("right").unwrap();
        assert_eq!(mapping.source_solver_syntax(), "_r_");
        assert_eq!(mapping.target_transform_syntax(), "_l_");
    }

    #[test]
    fn bad_expression_fails_to_load() {
        let mut document = MirrorMappingDocument::metahuman();
        document.solver_expression = "(unclosed".to_owned();
        assert!(matches!(
            MirrorMapping::from_document(document),
            Err(PoseWranglerError::InvalidRegex { .. })
        ));
    }
}
