use crate::boundary::{apply_boundary, FieldKind};
use crate::field::ScalarField;

// Relaxation runs a fixed sweep count instead of iterating to a tolerance,
// so every frame costs the same.
pub const RELAX_SWEEPS: usize = 20;
pub const DENSITY_FADE: f32 = 0.995;

const CURL_EPS: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidParams {
    pub dt: f32,
    pub diffusion: f32,
    pub viscosity: f32,
    pub fade: f32,
}

impl FluidParams {
    pub fn new(dt: f32, diffusion: f32, viscosity: f32) -> Self {
        Self {
            dt,
            diffusion,
            viscosity,
            fade: DENSITY_FADE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Fluid {
    size: usize,
    params: FluidParams,
    density: ScalarField,
    density_prev: ScalarField,
    vx: ScalarField,
    vy: ScalarField,
    vx_prev: ScalarField,
    vy_prev: ScalarField,
    curl: ScalarField,
}

impl Fluid {
    pub fn new(size: usize, params: FluidParams) -> Self {
        assert!(size >= 3, "grid side must be >= 3");
        Self {
            size,
            params,
            density: ScalarField::new(size),
            density_prev: ScalarField::new(size),
            vx: ScalarField::new(size),
            vy: ScalarField::new(size),
            vx_prev: ScalarField::new(size),
            vy_prev: ScalarField::new(size),
            curl: ScalarField::new(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn params(&self) -> FluidParams {
        self.params
    }

    pub fn params_mut(&mut self) -> &mut FluidParams {
        &mut self.params
    }

    pub fn density(&self) -> &ScalarField {
        &self.density
    }

    pub fn velocity(&self) -> (&ScalarField, &ScalarField) {
        (&self.vx, &self.vy)
    }

    pub fn add_density(&mut self, x: i32, y: i32, amount: f32) {
        if let Some((x, y)) = self.cell(x, y) {
            self.density.add(x, y, amount);
        }
    }

    pub fn add_velocity(&mut self, x: i32, y: i32, amount_x: f32, amount_y: f32) {
        if let Some((x, y)) = self.cell(x, y) {
            self.vx.add(x, y, amount_x);
            self.vy.add(x, y, amount_y);
        }
    }

    fn cell(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let n = self.size as i32;
        if x < 0 || y < 0 || x >= n || y >= n {
            return None;
        }
        Some((x as usize, y as usize))
    }

    pub fn step(&mut self, vorticity_strength: f32) {
        let FluidParams {
            dt,
            diffusion,
            viscosity,
            fade,
        } = self.params;
        if vorticity_strength > 0.0 {
            confine_vorticity(
                &mut self.vx,
                &mut self.vy,
                &mut self.curl,
                vorticity_strength,
                dt,
            );
        }
        diffuse(FieldKind::VelocityX, &mut self.vx_prev, &self.vx, viscosity, dt);
        diffuse(FieldKind::VelocityY, &mut self.vy_prev, &self.vy, viscosity, dt);
        project(
            &mut self.vx_prev,
            &mut self.vy_prev,
            &mut self.vx,
            &mut self.vy,
        );
        advect(
            FieldKind::VelocityX,
            &mut self.vx,
            &self.vx_prev,
            &self.vx_prev,
            &self.vy_prev,
            dt,
        );
        advect(
            FieldKind::VelocityY,
            &mut self.vy,
            &self.vy_prev,
            &self.vx_prev,
            &self.vy_prev,
            dt,
        );
        project(
            &mut self.vx,
            &mut self.vy,
            &mut self.vx_prev,
            &mut self.vy_prev,
        );
        diffuse(
            FieldKind::Scalar,
            &mut self.density_prev,
            &self.density,
            diffusion,
            dt,
        );
        advect(
            FieldKind::Scalar,
            &mut self.density,
            &self.density_prev,
            &self.vx,
            &self.vy,
            dt,
        );
        self.density.scale_in_place(fade);
    }
}

fn lin_solve(kind: FieldKind, x: &mut ScalarField, x0: &ScalarField, a: f32, c: f32) {
    let n = x.side();
    let c_recip = 1.0 / c;
    for _ in 0..RELAX_SWEEPS {
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                let neighbors =
                    x.get(i + 1, j) + x.get(i - 1, j) + x.get(i, j + 1) + x.get(i, j - 1);
                x.set(i, j, (x0.get(i, j) + a * neighbors) * c_recip);
            }
        }
        apply_boundary(kind, x);
    }
}

fn diffuse(kind: FieldKind, x: &mut ScalarField, x0: &ScalarField, coefficient: f32, dt: f32) {
    let interior = (x.side() - 2) as f32;
    let a = dt * coefficient * interior * interior;
    lin_solve(kind, x, x0, a, 1.0 + 6.0 * a);
}

fn project(vx: &mut ScalarField, vy: &mut ScalarField, p: &mut ScalarField, div: &mut ScalarField) {
    let n = vx.side();
    let div_scale = -0.5 / n as f32;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            div.set(
                i,
                j,
                div_scale
                    * (vx.get(i + 1, j) - vx.get(i - 1, j) + vy.get(i, j + 1) - vy.get(i, j - 1)),
            );
        }
    }
    p.fill(0.0);
    apply_boundary(FieldKind::Scalar, div);
    apply_boundary(FieldKind::Scalar, p);
    lin_solve(FieldKind::Scalar, p, div, 1.0, 6.0);
    let grad_scale = 0.5 * n as f32;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let gx = grad_scale * (p.get(i + 1, j) - p.get(i - 1, j));
            let gy = grad_scale * (p.get(i, j + 1) - p.get(i, j - 1));
            vx.add(i, j, -gx);
            vy.add(i, j, -gy);
        }
    }
    apply_boundary(FieldKind::VelocityX, vx);
    apply_boundary(FieldKind::VelocityY, vy);
}

fn advect(
    kind: FieldKind,
    d: &mut ScalarField,
    d0: &ScalarField,
    velocity_x: &ScalarField,
    velocity_y: &ScalarField,
    dt: f32,
) {
    let n = d.side();
    let dt0 = dt * (n as f32 - 2.0);
    // Clamping keeps the backtraced sample strictly inside the interior so
    // interpolation never reads a mirrored border value.
    let low = 0.5;
    let high = n as f32 - 1.5;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let src_x = (i as f32 - dt0 * velocity_x.get(i, j)).clamp(low, high);
            let src_y = (j as f32 - dt0 * velocity_y.get(i, j)).clamp(low, high);
            let i0 = src_x.floor() as usize;
            let j0 = src_y.floor() as usize;
            let i1 = i0 + 1;
            let j1 = j0 + 1;
            let s1 = src_x - i0 as f32;
            let s0 = 1.0 - s1;
            let t1 = src_y - j0 as f32;
            let t0 = 1.0 - t1;
            let value = s0 * (t0 * d0.get(i0, j0) + t1 * d0.get(i0, j1))
                + s1 * (t0 * d0.get(i1, j0) + t1 * d0.get(i1, j1));
            d.set(i, j, value);
        }
    }
    apply_boundary(kind, d);
}

fn confine_vorticity(
    vx: &mut ScalarField,
    vy: &mut ScalarField,
    curl: &mut ScalarField,
    strength: f32,
    dt: f32,
) {
    let n = vx.side();
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            curl.set(
                i,
                j,
                0.5 * ((vy.get(i + 1, j) - vy.get(i - 1, j))
                    - (vx.get(i, j + 1) - vx.get(i, j - 1))),
            );
        }
    }
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let grad_x = 0.5 * (curl.get(i + 1, j).abs() - curl.get(i - 1, j).abs());
            let grad_y = 0.5 * (curl.get(i, j + 1).abs() - curl.get(i, j - 1).abs());
            let magnitude = (grad_x * grad_x + grad_y * grad_y).sqrt() + CURL_EPS;
            let swirl = curl.get(i, j);
            vx.add(i, j, strength * dt * (grad_y / magnitude) * swirl);
            vy.add(i, j, strength * dt * (-grad_x / magnitude) * swirl);
        }
    }
    apply_boundary(FieldKind::VelocityX, vx);
    apply_boundary(FieldKind::VelocityY, vy);
}
