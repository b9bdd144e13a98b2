//! Fixed-step classical RK4

/// Preallocated stage buffers so that stepping does not allocate
#[derive(Debug, Clone)]
pub struct Rk4Workspace {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    ytmp: Vec<f64>,
}

impl Rk4Workspace {
    pub fn new(n: usize) -> Self {
        Self {
            k1: vec![0.0; n],
            k2: vec![0.0; n],
            k3: vec![0.0; n],
            k4: vec![0.0; n],
            ytmp: vec![0.0; n],
        }
    }

    fn resize(&mut self, n: usize) {
        if self.k1.len() != n {
            for buf in [
                &mut self.k1,
                &mut self.k2,
                &mut self.k3,
                &mut self.k4,
                &mut self.ytmp,
            ] {
                buf.resize(n, 0.0);
            }
        }
    }
}

/// Advance `y` from `t` to `t + dt`. `f(t, y, dy)` writes the derivative.
pub fn rk4_step<F>(y: &mut [f64], t: f64, dt: f64, ws: &mut Rk4Workspace, mut f: F)
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    let n = y.len();
    ws.resize(n);
    let Rk4Workspace {
        k1,
        k2,
        k3,
        k4,
        ytmp,
    } = ws;

    f(t, y, k1);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k1[i];
    }
    f(t + 0.5 * dt, ytmp, k2);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k2[i];
    }
    f(t + 0.5 * dt, ytmp, k3);

    for i in 0..n {
        ytmp[i] = y[i] + dt * k3[i];
    }
    f(t + dt, ytmp, k4);

    for i in 0..n {
        y[i] += (dt / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
}

/// Index of the first non-finite entry
pub fn first_non_finite(y: &[f64]) -> Option<usize> {
    y.iter().position(|v| !v.is_finite())
}
