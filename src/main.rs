use rs_obstacle_avoidance::serial_chain::SerialChain;
use nalgebra::{Isometry3, Vector3};

/// Three joint demo arm: base yaw, shoulder pitch, elbow pitch.
fn demo_arm() -> SerialChain {
    SerialChain::new("base")
        .revolute("shoulder", Isometry3::translation(0.0, 0.0, 0.3), Vector3::z())
        .revolute("upper_arm", Isometry3::identity(), Vector3::y())
        .revolute("forearm", Isometry3::translation(0.0, 0.0, 0.5), Vector3::y())
        .fixed("wrist", Isometry3::translation(0.0, 0.0, 0.4))
}

#[cfg(all(feature = "collisions", feature = "allow_filesystem"))]
mod demo {
    use std::path::PathBuf;
    use anyhow::{anyhow, Context, Result};
    use clap::Parser;
    use nalgebra::Isometry3;
    use parry3d::shape::SharedShape;
    use rs_obstacle_avoidance::avoid_obstacles::ObstacleAvoidance;
    use rs_obstacle_avoidance::avoidance_parameters::AvoidanceParameters;
    use rs_obstacle_avoidance::collisions::{CollisionBody, LinkShape, RobotBody};
    use rs_obstacle_avoidance::collisions_traits::AllowedCollisions;
    use rs_obstacle_avoidance::snapshot::SolverState;
    use rs_obstacle_avoidance::utils::{as_radians, dump_contribution, dump_joints};

    /// Evaluates the obstacle avoidance constraint for a demo arm next to a ball obstacle.
    #[derive(Parser)]
    #[command(version, about)]
    struct Args {
        /// YAML file with link_names and optional parameter arrays
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma separated joint values in degrees
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = vec![0.0, 20.0, 30.0])]
        joints: Vec<f64>,
    }

    fn capsule(link: &str, length: f32) -> LinkShape {
        LinkShape {
            link: link.to_string(),
            shape: SharedShape::capsule_z(length / 2.0, 0.05),
            local_transform: Isometry3::translation(0.0, 0.0, length / 2.0),
        }
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();
        let chain = super::demo_arm();

        let mut avoidance = ObstacleAvoidance::new();
        match &args.config {
            Some(path) => {
                AvoidanceParameters::from_yaml_file(path)
                    .and_then(|parameters| parameters.apply(&mut avoidance))
                    .with_context(|| format!("Reading {}", path.display()))?;
            }
            None => {
                avoidance.add_link("upper_arm");
                avoidance.add_link("forearm");
            }
        }
        avoidance.bind(&chain)?;

        let body = RobotBody {
            link_shapes: vec![capsule("upper_arm", 0.5), capsule("forearm", 0.4)],
            collision_environment: vec![CollisionBody {
                name: "ball".to_string(),
                shape: SharedShape::ball(0.1),
                pose: Isometry3::translation(0.45, 0.0, 0.9),
            }],
            margin: 1.0,
        };
        let allowed = AllowedCollisions::new().with("upper_arm", "forearm");

        let joints = as_radians(&args.joints);
        if joints.len() != 3 {
            return Err(anyhow!("The demo arm has 3 joints, {} values given", joints.len()));
        }
        let state = SolverState { joints: &joints, chain: &chain, collisions: &body, allowed: &allowed };
        let contribution = avoidance.evaluate(&state)?;

        print!("Joints: ");
        dump_joints(&joints);
        dump_contribution(&avoidance.link_names(), &contribution);
        println!("Row weights: {}", avoidance.row_weights().transpose());
        Ok(())
    }
}

#[cfg(all(feature = "collisions", feature = "allow_filesystem"))]
fn main() -> anyhow::Result<()> {
    demo::run()
}

/// Without collisions and clap, only show how the constraint binds to the chain.
#[cfg(not(all(feature = "collisions", feature = "allow_filesystem")))]
fn main() -> anyhow::Result<()> {
    use rs_obstacle_avoidance::avoid_obstacles::ObstacleAvoidance;

    let chain = demo_arm();
    let mut avoidance = ObstacleAvoidance::new();
    avoidance.bind(&chain)?;
    for link in avoidance.links() {
        println!("{}: {} of {} joints", link.name(), link.inboard_joints(), link.total_joints());
    }
    Ok(())
}
