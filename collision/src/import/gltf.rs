use std::fmt;
use std::path::{Path, PathBuf};

use gltf::buffer::Data;
use gltf::mesh::Mode;
use gltf::{Document, Node};
use itertools::Itertools;
use nalgebra::{Matrix4, Point3, Quaternion, Scale3, Translation3, UnitQuaternion};

use crate::maths::Transform;
use crate::skinning::pose::Skeleton;
use crate::skinning::source::{BoneWeights, SkinnedMeshSource, SourceError};

#[derive(Debug, Clone)]
pub enum ImportError {
    ModelDoesNotExist(PathBuf),
    InvalidGltf(PathBuf, String),
    NoSkinnedMesh(PathBuf),
    NodeNotFound(PathBuf, String),
    NoPositions(PathBuf),
    NoIndices(PathBuf),
    NoJoints(PathBuf),
    NoWeights(PathBuf),
    InvalidSource(PathBuf, SourceError),
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSource(_, error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ModelDoesNotExist(path) => {
                write!(f, "The model \"{:?}\" does not exist", path)
            }
            Self::InvalidGltf(path, reason) => {
                write!(f, "The model {:?} is not valid glTF: {}", path, reason)
            }
            Self::NoSkinnedMesh(path) => {
                write!(f, "The model {:?} has no node with both a mesh and a skin", path)
            }
            Self::NodeNotFound(path, name) => {
                write!(f, "The model {:?} has no skinned mesh node named \"{}\"", path, name)
            }
            Self::NoPositions(path) => {
                write!(f, "Could not extract primitive vertex positions for the model {:?}", path)
            }
            Self::NoIndices(path) => {
                write!(f, "Could not extract primitive indices for the model {:?}", path)
            }
            Self::NoJoints(path) => {
                write!(f, "Could not extract primitive joint indices for the model {:?}", path)
            }
            Self::NoWeights(path) => {
                write!(f, "Could not extract primitive joint weights for the model {:?}", path)
            }
            Self::InvalidSource(path, error) => {
                write!(f, "The skinned mesh in {:?} is invalid: {}", path, error)
            }
        }
    }
}

/// A skinned mesh read from a glTF file, ready to build a collider from.
#[derive(Debug, Clone)]
pub struct SkinnedAsset {
    pub name: String,
    pub source: SkinnedMeshSource,
    /// World space transforms of the mesh node and every joint, as authored.
    pub rest_pose: Skeleton,
    /// One per bone, in bone index order.
    pub joint_names: Vec<String>,
}

/// Loads the first node carrying both a mesh and a skin, or the one called `node_name`.
pub fn load(path: impl AsRef<Path>, node_name: Option<&str>) -> Result<SkinnedAsset, ImportError> {
    let path = path.as_ref().to_path_buf();
    log::info!("Loading gltf {:?}...", path);

    let (document, file_buffers, _images) = gltf::import(&path).map_err(|error| match error {
        gltf::Error::Io(_) => ImportError::ModelDoesNotExist(path.clone()),
        error => ImportError::InvalidGltf(path.clone(), error.to_string()),
    })?;

    from_document(&document, &file_buffers, &path, node_name)
}

/// [`load`] for a self contained glTF already in memory. Buffers must be embedded.
pub fn load_slice(bytes: &[u8], node_name: Option<&str>) -> Result<SkinnedAsset, ImportError> {
    let path = PathBuf::from("<memory>");

    let (document, file_buffers, _images) =
        gltf::import_slice(bytes).map_err(|error| ImportError::InvalidGltf(path.clone(), error.to_string()))?;

    from_document(&document, &file_buffers, &path, node_name)
}

fn from_document(
    document: &Document,
    file_buffers: &[Data],
    path: &Path,
    node_name: Option<&str>,
) -> Result<SkinnedAsset, ImportError> {
    let mut skinned_nodes = document.nodes().filter(|node| node.mesh().is_some() && node.skin().is_some());

    let node = match node_name {
        Some(name) => skinned_nodes
            .find(|node| node.name() == Some(name))
            .ok_or_else(|| ImportError::NodeNotFound(path.to_path_buf(), name.to_owned()))?,
        None => skinned_nodes
            .next()
            .ok_or_else(|| ImportError::NoSkinnedMesh(path.to_path_buf()))?,
    };

    let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) else {
        return Err(ImportError::NoSkinnedMesh(path.to_path_buf()));
    };

    let name = node
        .name()
        .or(mesh.name())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("node {}", node.index()));

    log::debug!("Importing skinned mesh \"{}\"", name);

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut weights = Vec::new();

    for (primitive_index, primitive) in mesh.primitives().enumerate() {
        if primitive.mode() != Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of \"{}\", only triangle lists are supported",
                primitive_index,
                name
            );
            continue;
        }

        log::debug!("Loading primitive {}", primitive_index);

        let reader = primitive.reader(|buffer| Some(&file_buffers[buffer.index()].0[..]));

        let offset = positions.len() as u32;

        positions.extend(
            reader
                .read_positions()
                .ok_or_else(|| ImportError::NoPositions(path.to_path_buf()))?
                .map(Point3::from),
        );

        indices.extend(
            reader
                .read_indices()
                .ok_or_else(|| ImportError::NoIndices(path.to_path_buf()))?
                .into_u32()
                .map(|index| index + offset),
        );

        let joints = reader
            .read_joints(0)
            .ok_or_else(|| ImportError::NoJoints(path.to_path_buf()))?
            .into_u16();

        let joint_weights = reader
            .read_weights(0)
            .ok_or_else(|| ImportError::NoWeights(path.to_path_buf()))?
            .into_f32();

        weights.extend(
            joints
                .zip(joint_weights)
                .map(|(joints, joint_weights)| BoneWeights::from_joints(joints, joint_weights)),
        );

        if reader.read_joints(1).is_some() {
            log::warn!("Only the first set of joints is used, a vertex can have at most 4 bones");
        }
    }

    let joints = skin.joints().collect_vec();

    let reader = skin.reader(|buffer| Some(&file_buffers[buffer.index()].0[..]));
    let inverse_bind_matrices = match reader.read_inverse_bind_matrices() {
        Some(matrices) => matrices.map(Matrix4::from).collect_vec(),
        None => vec![Matrix4::identity(); joints.len()],
    };

    let source = SkinnedMeshSource::new(positions, &indices, inverse_bind_matrices, weights)
        .map_err(|error| ImportError::InvalidSource(path.to_path_buf(), error))?;

    let world_transforms = world_transforms(document);
    let world_transform = |node: &Node| world_transforms[node.index()].clone();

    let rest_pose = Skeleton::new(world_transform(&node), joints.iter().map(world_transform).collect());

    let joint_names = joints
        .iter()
        .map(|joint| {
            joint
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("joint {}", joint.index()))
        })
        .collect();

    log::info!(
        "Imported \"{}\" with {} vertices, {} triangles and {} bones",
        name,
        source.positions().len(),
        source.triangles().len(),
        source.bone_count()
    );

    Ok(SkinnedAsset {
        name,
        source,
        rest_pose,
        joint_names,
    })
}

fn local_transform(node: &Node) -> Transform {
    let (translation, [x, y, z, w], scale) = node.transform().decomposed();

    Transform::new(
        Translation3::new(translation[0], translation[1], translation[2]),
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        Scale3::new(scale[0], scale[1], scale[2]),
    )
}

/// World transform of every node, indexed by node index. Nodes outside the scene keep their local
/// transform.
fn world_transforms(document: &Document) -> Vec<Transform> {
    let mut transforms = document.nodes().map(|node| local_transform(&node)).collect_vec();

    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return transforms;
    };

    let mut stack = scene
        .nodes()
        .map(|node| (node, Transform::identity()))
        .collect_vec();

    while let Some((node, parent)) = stack.pop() {
        let local = &transforms[node.index()];
        if !local.combines_without_shear(&parent) {
            log::warn!(
                "Node {} is rotated under a non-uniformly scaled parent, its rest pose drops the shear",
                node.name().unwrap_or("unnamed")
            );
        }

        let world = local.combine(&parent);

        stack.extend(node.children().map(|child| (child, world.clone())));
        transforms[node.index()] = world;
    }

    transforms
}
