use crate::solver::Fluid;
use rand::Rng;

pub const PAINT_DENSITY: f32 = 400.0;
pub const DRAG_VELOCITY_SCALE: f32 = 0.2;
pub const AUDIO_VELOCITY_SCALE: f32 = 0.01;

// Cursor paint: density under the cursor, velocity from the drag delta.
pub fn paint_density(fluid: &mut Fluid, cell: (i32, i32)) {
    fluid.add_density(cell.0, cell.1, PAINT_DENSITY);
}

pub fn drag_velocity(fluid: &mut Fluid, cell: (i32, i32), delta: (f32, f32)) {
    fluid.add_velocity(
        cell.0,
        cell.1,
        delta.0 * DRAG_VELOCITY_SCALE,
        delta.1 * DRAG_VELOCITY_SCALE,
    );
}

// One burst of density plus a random kick, landing in the central half of
// the grid.
pub fn random_splat(fluid: &mut Fluid, rng: &mut impl Rng) {
    let n = fluid.size() as i32;
    let low = n / 4;
    let high = n * 3 / 4;
    let x = rng.gen_range(low..high);
    let y = rng.gen_range(low..high);
    fluid.add_density(x, y, rng.gen_range(500.0..1000.0));
    let kick_x = (rng.gen::<f32>() - 0.5) * 5.0;
    let kick_y = (rng.gen::<f32>() - 0.5) * 5.0;
    fluid.add_velocity(x, y, kick_x, kick_y);
}

// Loudness arrives as a plain number; capture hardware stays outside the
// simulation entirely.
pub fn audio_splat(fluid: &mut Fluid, rng: &mut impl Rng, level: f32, threshold: f32) {
    if level <= threshold {
        return;
    }
    let n = fluid.size() as i32;
    let x = rng.gen_range(0..n);
    let y = rng.gen_range(0..n);
    fluid.add_density(x, y, level);
    let kick_x = (rng.gen::<f32>() - 0.5) * level * AUDIO_VELOCITY_SCALE;
    let kick_y = (rng.gen::<f32>() - 0.5) * level * AUDIO_VELOCITY_SCALE;
    fluid.add_velocity(x, y, kick_x, kick_y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::FluidParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_fluid() -> Fluid {
        Fluid::new(32, FluidParams::new(0.1, 1e-4, 1e-7))
    }

    #[test]
    fn paint_density_hits_the_cursor_cell() {
        let mut fluid = test_fluid();
        paint_density(&mut fluid, (10, 12));
        assert_eq!(fluid.density().get(10, 12), PAINT_DENSITY);
        assert_eq!(fluid.density().sum(), PAINT_DENSITY);
    }

    #[test]
    fn paint_outside_the_grid_is_ignored() {
        let mut fluid = test_fluid();
        paint_density(&mut fluid, (-4, 2));
        drag_velocity(&mut fluid, (40, 2), (10.0, 10.0));
        assert_eq!(fluid.density().sum(), 0.0);
        let (vx, vy) = fluid.velocity();
        assert_eq!(vx.sum(), 0.0);
        assert_eq!(vy.sum(), 0.0);
    }

    #[test]
    fn drag_velocity_scales_the_delta() {
        let mut fluid = test_fluid();
        drag_velocity(&mut fluid, (5, 5), (10.0, -5.0));
        let (vx, vy) = fluid.velocity();
        assert_eq!(vx.get(5, 5), 2.0);
        assert_eq!(vy.get(5, 5), -1.0);
    }

    #[test]
    fn random_splats_land_in_the_central_region() {
        let mut fluid = test_fluid();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            random_splat(&mut fluid, &mut rng);
        }
        let n = fluid.size();
        let density = fluid.density();
        for y in 0..n {
            for x in 0..n {
                if density.get(x, y) != 0.0 {
                    assert!((n / 4..n * 3 / 4).contains(&x));
                    assert!((n / 4..n * 3 / 4).contains(&y));
                }
            }
        }
        assert!(density.sum() >= 50.0 * 500.0);
    }

    #[test]
    fn quiet_audio_injects_nothing() {
        let mut fluid = test_fluid();
        let mut rng = StdRng::seed_from_u64(7);
        audio_splat(&mut fluid, &mut rng, 30.0, 50.0);
        audio_splat(&mut fluid, &mut rng, 50.0, 50.0);
        assert_eq!(fluid.density().sum(), 0.0);
    }

    #[test]
    fn loud_audio_injects_its_level_as_density() {
        let mut fluid = test_fluid();
        let mut rng = StdRng::seed_from_u64(7);
        audio_splat(&mut fluid, &mut rng, 120.0, 50.0);
        assert!((fluid.density().sum() - 120.0).abs() < 1e-3);
    }

    #[test]
    fn seeded_splats_are_deterministic() {
        let mut first = test_fluid();
        let mut second = test_fluid();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        random_splat(&mut first, &mut rng_a);
        random_splat(&mut second, &mut rng_b);
        assert_eq!(first.density().as_slice(), second.density().as_slice());
    }
}
