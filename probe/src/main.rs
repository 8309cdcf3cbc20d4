use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use log::LevelFilter;
use nalgebra::{Point3, Vector3};

use skinned_collision::collision::colliders::Sphere;
use skinned_collision::debug::set_up_logging;
use skinned_collision::import::gltf;
use skinned_collision::maths::Ray;
use skinned_collision::{Hit, Skeleton, SkinnedMeshCollider};

/// Casts a ray or sphere against a skinned glTF mesh and prints what it hits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// glTF or glb file holding a skinned mesh
    model: PathBuf,

    /// Name of the skinned mesh node to use, defaults to the first one found
    #[arg(long)]
    node: Option<String>,

    /// JSON pose to skin the mesh with, defaults to the pose stored in the model
    #[arg(long)]
    pose: Option<PathBuf>,

    /// Print hits to stdout as JSON
    #[arg(long)]
    json: bool,

    /// Also log every bone's bounding sphere
    #[arg(long)]
    bounds: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    #[command(subcommand)]
    query: Query,
}

#[derive(Subcommand, Debug)]
enum Query {
    Ray {
        #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["X", "Y", "Z"])]
        origin: Vec<f32>,

        #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["X", "Y", "Z"])]
        direction: Vec<f32>,

        #[arg(long, default_value_t = f32::INFINITY)]
        max_distance: f32,
    },
    Sphere {
        #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["X", "Y", "Z"])]
        center: Vec<f32>,

        #[arg(long)]
        radius: f32,
    },
}

fn vector(values: &[f32]) -> color_eyre::Result<Vector3<f32>> {
    match values {
        &[x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(eyre!("Expected 3 components, got {}", values.len())),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    set_up_logging(args.log_level).wrap_err("Could not set up logging")?;

    let asset = gltf::load(&args.model, args.node.as_deref())
        .wrap_err_with(|| format!("Could not load {:?}", args.model))?;

    let pose = match &args.pose {
        Some(path) => {
            let json = fs::read_to_string(path).wrap_err_with(|| format!("Could not read pose {:?}", path))?;
            Skeleton::from_json(&json).wrap_err_with(|| format!("Could not parse pose {:?}", path))?
        }
        None => asset.rest_pose.clone(),
    };

    let mut collider = SkinnedMeshCollider::new(asset.name.clone(), &asset.source);
    collider.recompute_vertices(&pose);

    if args.bounds {
        for (bone, sphere) in collider.bone_bounding_spheres() {
            let name = asset.joint_names.get(bone.0).map(String::as_str).unwrap_or("?");
            log::info!(
                "Bone {} \"{}\": centre {:?} radius {}",
                bone.0,
                name,
                sphere.origin,
                sphere.radius
            );
        }
    }

    let hits = match args.query {
        Query::Ray {
            origin,
            direction,
            max_distance,
        } => {
            let ray = Ray::new(Point3::from(vector(&origin)?), vector(&direction)?);
            if ray.is_degenerate() {
                log::warn!("The ray direction has no length, nothing can be hit");
            }

            collider.cast_ray_all(&ray, max_distance)
        }
        Query::Sphere { center, radius } => {
            collider.cast_sphere_all(&Sphere::new(Point3::from(vector(&center)?), radius))
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        log_hits(&hits, &asset.joint_names);
    }

    Ok(())
}

fn log_hits(hits: &[Hit], joint_names: &[String]) {
    if hits.is_empty() {
        log::info!("No hits");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        let bone = joint_names.get(hit.bone.0).map(String::as_str).unwrap_or("?");
        log::info!(
            "#{} distance {:.4} at {:?} normal {:?} triangle {} bone \"{}\"",
            i,
            hit.distance,
            hit.point,
            hit.normal,
            hit.triangle_index,
            bone
        );
    }
}
