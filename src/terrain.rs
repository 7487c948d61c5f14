// ==============================================================================
// terrain.rs — HEIGHTFIELD ASSET + STATIC TERRAIN ENTITY
// ------------------------------------------------------------------------------
// The heightmap is a JSON file loaded off the simulation task. When it is
// ready it is handed to the game loop, which inserts the collider and queues
// a Terrain entity; a failed load only logs, the flat ground stays.
//
// JSON layout:
//   { "rows": R, "cols": C, "heights": [R*C floats, column-major],
//     "scale": [x, y, z], "translation": [x, y, z] }
// ==============================================================================

use std::path::Path;

use rapier3d::prelude::ColliderHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::Entity;
use crate::error::AssetError;
use crate::physics::PhysicsWorld;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightfieldData {
    pub rows: usize,
    pub cols: usize,
    pub heights: Vec<f32>,
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub translation: [f32; 3],
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl HeightfieldData {
    /// A grid rapier can build a heightfield from.
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(AssetError::TooSmall { rows: self.rows, cols: self.cols });
        }
        if self.heights.len() != self.rows * self.cols {
            return Err(AssetError::Shape {
                rows: self.rows,
                cols: self.cols,
                len: self.heights.len(),
            });
        }
        Ok(())
    }
}

pub fn parse_heightfield(json: &str, path: &Path) -> Result<HeightfieldData, AssetError> {
    let data: HeightfieldData = serde_json::from_str(json).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    data.validate()?;
    Ok(data)
}

pub async fn load_heightfield(path: impl AsRef<Path>) -> Result<HeightfieldData, AssetError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let data = parse_heightfield(&json, path)?;
    debug!(path = %path.display(), rows = data.rows, cols = data.cols, "heightfield loaded");
    Ok(data)
}

/// Static ground with no per-tick work; it only owns its collider.
pub struct Terrain {
    pub collider: ColliderHandle,
}

impl Terrain {
    pub fn spawn(world: &mut PhysicsWorld, data: &HeightfieldData) -> Self {
        let collider = world.insert_heightfield(data);
        info!(?collider, rows = data.rows, cols = data.cols, "terrain inserted");
        Self { collider }
    }
}

impl Entity for Terrain {
    fn name(&self) -> &str {
        "terrain"
    }
}
