use crate::config::EstimatorConfig;
use nalgebra::{matrix, Matrix2, Matrix2x4, Matrix4, Point2, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Constant-velocity Kalman filter over image position, one step per frame.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    pub state: KalmanState,
    /// The next measurement replaces the position instead of being fused.
    seed_pending: bool,
    /// State transition matrix
    f: Matrix4<f64>,
    /// Covariance matrix of estimation error
    pub p: Matrix4<f64>,
    /// Covariance matrix of measurement error
    pub r: Matrix2<f64>,
    /// Covariance matrix of process noise
    pub q: Matrix4<f64>,
    /// Observation Matrix
    pub h: Matrix2x4<f64>,
}

impl KalmanFilter {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self::with_state(config, KalmanState::default())
    }

    pub fn with_state(config: &EstimatorConfig, state: KalmanState) -> Self {
        // Zero p -> the first corrections barely move the state
        let p = Matrix4::identity() * config.initial_covariance;
        let q = Matrix4::identity() * config.process_noise;
        let r = Matrix2::identity() * config.measurement_noise;
        let f = matrix![1., 0., 1., 0.;
                        0., 1., 0., 1.;
                        0., 0., 1., 0.;
                        0., 0., 0., 1.];
        let h = matrix![1., 0., 0., 0.;
                        0., 1., 0., 0.];
        Self {
            state,
            seed_pending: config.seed_with_first_measurement,
            f,
            p,
            r,
            q,
            h,
        }
    }

    /// Advance the state by one frame and return the projected position.
    pub fn predict(&mut self) -> Point2<f64> {
        self.state = KalmanState::from_vec(&(self.f * self.state.to_vec()));
        self.p = self.f * self.p * self.f.transpose() + self.q;
        trace!(x = self.state.pos_x, y = self.state.pos_y, "kalman predict");
        self.state.position()
    }

    /// Fuse a measured position into the current estimate.
    pub fn correct(&mut self, measurement: Point2<f64>) {
        if self.seed_pending {
            self.seed_pending = false;
            self.state = KalmanState {
                pos_x: measurement.x,
                pos_y: measurement.y,
                vel_x: 0.0,
                vel_y: 0.0,
            };
            trace!(x = measurement.x, y = measurement.y, "kalman seeded");
            return;
        }

        let s = self.h * self.p * self.h.transpose() + self.r;
        let Some(s_inv) = s.try_inverse() else {
            trace!("singular innovation covariance, correction skipped");
            return;
        };
        let k = self.p * self.h.transpose() * s_inv;

        let state_vec = self.state.to_vec();
        let innovation = Vector2::new(measurement.x, measurement.y) - self.h * state_vec;
        self.state = KalmanState::from_vec(&(state_vec + k * innovation));

        let i_kh = Matrix4::identity() - k * self.h;
        self.p = i_kh * self.p * i_kh.transpose() + k * self.r * k.transpose();
        trace!(x = self.state.pos_x, y = self.state.pos_y, "kalman correct");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    pub pos_x: f64,
    pub pos_y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
}

impl KalmanState {
    pub fn to_vec(&self) -> Vector4<f64> {
        let Self {
            pos_x,
            pos_y,
            vel_x,
            vel_y,
        } = *self;
        matrix![pos_x; pos_y; vel_x; vel_y]
    }

    pub fn from_vec(from: &Vector4<f64>) -> Self {
        KalmanState {
            pos_x: from[0],
            pos_y: from[1],
            vel_x: from[2],
            vel_y: from[3],
        }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.pos_x, self.pos_y)
    }

    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.vel_x, self.vel_y)
    }
}
