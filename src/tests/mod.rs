
#[cfg(feature = "collisions")]
mod test_parry_scene;
