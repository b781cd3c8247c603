//! How infectious a person is as a function of the time since they were exposed, in hours.
//! Both curves are zero outside their support, including for people never exposed (whose
//! elapsed time is infinite).

pub trait InfectiousnessCurve {
    /// Dimensionless contribution of one infectious person at elapsed time `t`.
    fn infectiousness(&self, t: f64) -> f64;

    /// The quantity used to rank people by how infectious they are. Defaults to
    /// `infectiousness`.
    fn viral_load(&self, t: f64) -> f64 {
        self.infectiousness(t)
    }
}

/// Rises linearly from 0 at `t_min` to 1 at `t_mode`, then falls linearly back to 0 at `t_max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampCurve {
    pub t_min: f64,
    pub t_mode: f64,
    pub t_max: f64,
}

impl InfectiousnessCurve for RampCurve {
    fn infectiousness(&self, t: f64) -> f64 {
        if t >= self.t_min && t < self.t_mode {
            (t - self.t_min) / (self.t_mode - self.t_min)
        } else if t >= self.t_mode && t <= self.t_max {
            if self.t_max > self.t_mode {
                (self.t_max - t) / (self.t_max - self.t_mode)
            } else {
                1.0
            }
        } else {
            0.0
        }
    }
}

/// A piecewise-linear viral load (zero until `latent`, peaking at `v_max` at `incubation`,
/// back to zero `contagious` hours later) fed through a logistic dose-response with rate `r`
/// and midpoint `v0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViralLoadCurve {
    pub latent: f64,
    pub incubation: f64,
    pub contagious: f64,
    pub v_max: f64,
    pub r: f64,
    pub v0: f64,
}

impl ViralLoadCurve {
    /// Logistic probability of transmission for a viral load `v`.
    #[must_use]
    pub fn dose_response(&self, v: f64) -> f64 {
        1.0 / (1.0 + (-self.r * (v - self.v0)).exp())
    }
}

impl InfectiousnessCurve for ViralLoadCurve {
    fn infectiousness(&self, t: f64) -> f64 {
        let v = self.viral_load(t);
        if v > 0.0 {
            self.dose_response(v)
        } else {
            0.0
        }
    }

    fn viral_load(&self, t: f64) -> f64 {
        if t >= self.latent && t < self.incubation {
            self.v_max * (t - self.latent) / (self.incubation - self.latent)
        } else if t >= self.incubation && t < self.incubation + self.contagious {
            self.v_max * (self.incubation + self.contagious - t) / self.contagious
        } else {
            0.0
        }
    }
}
