use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::KalmanConfig;
use crate::error::{KalmanError, KalmanResult};
use crate::types::linalg::{
    serde_rows, ControlMat, ControlVec, KalmanGain, MeasurementNoiseMat, MeasurementVec,
    ObservationMat, ProcessNoiseMat, StateMat, StateVec, TransitionMat,
};

/// Serializable copy of the belief and the predict/update counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    pub state: Vec<f64>,
    #[serde(with = "serde_rows")]
    pub covariance: DMatrix<f64>,
    pub covariance_trace: f64,
    pub predict_count: u64,
    pub update_count: u64,
}

/// Discrete-time linear Kalman filter.
///
/// ```text
/// x_(k+1) = F x_k + B u_k + w,   w ~ N(0, Q)
/// z_k     = H x_k + v,           v ~ N(0, R)
/// ```
///
/// `predict` and `update` may be called in any order. Both compute into
/// temporaries and only commit `x`/`P` once every step has succeeded, so a
/// failed call leaves the belief untouched.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    n: usize,
    m: usize,

    f: TransitionMat,
    h: ObservationMat,
    // None is the zero transform: control input contributes nothing.
    b: Option<ControlMat>,
    q: ProcessNoiseMat,
    r: MeasurementNoiseMat,

    x: StateVec,
    p: StateMat,

    predict_count: u64,
    update_count: u64,
}

fn check_config_shape(
    name: &'static str,
    m: &DMatrix<f64>,
    expected: (usize, usize),
) -> KalmanResult<()> {
    if m.shape() != expected {
        return Err(KalmanError::Configuration(
            KalmanError::matrix_shape(name, expected, m.shape()).to_string(),
        ));
    }
    Ok(())
}

impl KalmanFilter {
    pub fn new(config: KalmanConfig) -> KalmanResult<Self> {
        let f = config.f.filter(|f| !f.is_empty()).ok_or_else(|| {
            KalmanError::Configuration("Set proper system dynamics: F is required".into())
        })?;
        let h = config.h.filter(|h| !h.is_empty()).ok_or_else(|| {
            KalmanError::Configuration("Set proper system dynamics: H is required".into())
        })?;

        let n = f.ncols();
        let m = h.nrows();

        check_config_shape("transition model F", &f, (n, n))?;
        check_config_shape("observation model H", &h, (m, n))?;
        if let Some(b) = &config.b {
            if b.nrows() != n {
                return Err(KalmanError::Configuration(format!(
                    "control model B must have {n} rows, got {}x{}",
                    b.nrows(),
                    b.ncols()
                )));
            }
        }

        let q = config.q.unwrap_or_else(|| DMatrix::identity(n, n));
        let r = config.r.unwrap_or_else(|| DMatrix::identity(m, m));
        let p = config.p.unwrap_or_else(|| DMatrix::identity(n, n));
        let x = config.x0.unwrap_or_else(|| DVector::zeros(n));

        check_config_shape("process noise Q", &q, (n, n))?;
        check_config_shape("measurement noise R", &r, (m, m))?;
        check_config_shape("initial covariance P", &p, (n, n))?;
        if x.len() != n {
            return Err(KalmanError::Configuration(
                KalmanError::vector_len("initial state x0", n, x.len()).to_string(),
            ));
        }

        debug!(
            "Kalman filter initialised: n={n}, m={m}, control={}",
            config.b.as_ref().map_or(0, |b| b.ncols())
        );

        Ok(Self {
            n,
            m,
            f,
            h,
            b: config.b,
            q,
            r,
            x,
            p,
            predict_count: 0,
            update_count: 0,
        })
    }

    /// Propagate the belief one step with no control input.
    pub fn predict(&mut self) -> &StateVec {
        let (x_pred, p_pred) = self.propagate(&self.x, &self.p);
        self.commit_predict(x_pred, p_pred);
        &self.x
    }

    /// Propagate the belief one step, adding `B·u`.
    ///
    /// With no control model configured, `u` is ignored.
    pub fn predict_with_control(&mut self, u: &ControlVec) -> KalmanResult<&StateVec> {
        let (mut x_pred, p_pred) = self.propagate(&self.x, &self.p);
        x_pred += self.control_term(u)?;
        self.commit_predict(x_pred, p_pred);
        Ok(&self.x)
    }

    // x = F * x, P = F * P * F^T + Q
    fn propagate(&self, x: &StateVec, p: &StateMat) -> (StateVec, StateMat) {
        let x_pred = &self.f * x;
        let p_pred = &self.f * p * self.f.transpose() + &self.q;
        (x_pred, p_pred)
    }

    // B * u, zero when no control model is configured
    fn control_term(&self, u: &ControlVec) -> KalmanResult<StateVec> {
        match &self.b {
            Some(b) if u.len() != b.ncols() => {
                Err(KalmanError::vector_len("control input u", b.ncols(), u.len()))
            }
            Some(b) => Ok(b * u),
            None => Ok(DVector::zeros(self.n)),
        }
    }

    fn commit_predict(&mut self, x: StateVec, p: StateMat) {
        self.x = x;
        self.p = p;
        self.predict_count += 1;
        trace!("predict #{}: x={:?}", self.predict_count, self.x.as_slice());
    }

    /// Correction of the belief `(x, p)` by `z`, without committing.
    /// Returns the corrected state, covariance and innovation norm.
    fn correct(
        &self,
        x: &StateVec,
        p: &StateMat,
        z: &MeasurementVec,
    ) -> KalmanResult<(StateVec, StateMat, f64)> {
        if z.len() != self.m {
            return Err(KalmanError::vector_len("measurement z", self.m, z.len()));
        }

        let h_transpose = self.h.transpose();
        let y = z - &self.h * x;
        let s = &self.r + &self.h * p * &h_transpose;
        let s_inv = s
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                warn!("Innovation covariance is singular, measurement rejected");
                KalmanError::SingularMatrix {
                    name: "innovation covariance S",
                    rows: self.m,
                    cols: self.m,
                }
            })?;
        let k: KalmanGain = p * &h_transpose * s_inv;
        let x_new = x + &k * &y;

        // Joseph form keeps P symmetric and PSD under round-off
        let identity = DMatrix::<f64>::identity(self.n, self.n);
        let i_kh = identity - &k * &self.h;
        let p_new = &i_kh * p * i_kh.transpose() + &k * &self.r * k.transpose();

        Ok((x_new, p_new, y.norm()))
    }

    fn commit_update(&mut self, x: StateVec, p: StateMat, innovation: f64) {
        self.x = x;
        self.p = p;
        self.update_count += 1;
        trace!(
            "update #{}: |y|={:.6}, x={:?}",
            self.update_count,
            innovation,
            self.x.as_slice()
        );
    }

    /// Correct the belief with measurement `z` (length m).
    ///
    /// Returns the corrected state. Fails without touching the belief if `z`
    /// has the wrong length or the innovation covariance is singular.
    pub fn update(&mut self, z: &MeasurementVec) -> KalmanResult<&StateVec> {
        let (x_new, p_new, innovation) = self.correct(&self.x, &self.p, z)?;
        self.commit_update(x_new, p_new, innovation);
        Ok(&self.x)
    }

    /// Scalar measurement, only valid when m = 1.
    pub fn update_scalar(&mut self, z: f64) -> KalmanResult<&StateVec> {
        if self.m != 1 {
            return Err(KalmanError::vector_len("measurement z", self.m, 1));
        }
        self.update(&DVector::from_element(1, z))
    }

    /// Observation predicted from the current state, `H·x`.
    pub fn predicted_measurement(&self) -> MeasurementVec {
        &self.h * &self.x
    }

    /// One predict/update cycle. Returns the predicted observation taken
    /// between the two phases.
    ///
    /// Both phases run on temporaries; if either fails the belief and the
    /// counters are left as they were.
    pub fn step(
        &mut self,
        z: &MeasurementVec,
        u: Option<&ControlVec>,
    ) -> KalmanResult<MeasurementVec> {
        let (mut x_pred, p_pred) = self.propagate(&self.x, &self.p);
        if let Some(u) = u {
            x_pred += self.control_term(u)?;
        }
        let prediction = &self.h * &x_pred;
        let (x_new, p_new, innovation) = self.correct(&x_pred, &p_pred, z)?;

        self.commit_predict(x_pred, p_pred);
        self.commit_update(x_new, p_new, innovation);
        Ok(prediction)
    }

    /// Run `step` over a batch of measurements, collecting each prediction.
    pub fn filter_sequence(
        &mut self,
        measurements: &[MeasurementVec],
    ) -> KalmanResult<Vec<MeasurementVec>> {
        measurements.iter().map(|z| self.step(z, None)).collect()
    }

    /// Scalar variant of `filter_sequence` for single-output models.
    pub fn filter_scalars(&mut self, measurements: &[f64]) -> KalmanResult<Vec<f64>> {
        if self.m != 1 {
            return Err(KalmanError::vector_len("measurement z", self.m, 1));
        }
        let mut out = Vec::with_capacity(measurements.len());
        for &z in measurements {
            let prediction = self.step(&DVector::from_element(1, z), None)?;
            out.push(prediction[0]);
        }
        Ok(out)
    }

    pub fn set_process_noise(&mut self, q: ProcessNoiseMat) -> KalmanResult<()> {
        check_config_shape("process noise Q", &q, (self.n, self.n))?;
        self.q = q;
        Ok(())
    }

    pub fn set_measurement_noise(&mut self, r: MeasurementNoiseMat) -> KalmanResult<()> {
        check_config_shape("measurement noise R", &r, (self.m, self.m))?;
        self.r = r;
        Ok(())
    }

    /// Replace the control model. `None` disables the control input.
    pub fn set_control(&mut self, b: Option<ControlMat>) -> KalmanResult<()> {
        if let Some(b) = &b {
            if b.nrows() != self.n {
                return Err(KalmanError::Configuration(format!(
                    "control model B must have {} rows, got {}x{}",
                    self.n,
                    b.nrows(),
                    b.ncols()
                )));
            }
        }
        self.b = b;
        Ok(())
    }

    /// Re-initialise the belief. Counters are kept.
    pub fn reset(&mut self, x0: StateVec, p0: StateMat) -> KalmanResult<()> {
        if x0.len() != self.n {
            return Err(KalmanError::Configuration(
                KalmanError::vector_len("initial state x0", self.n, x0.len()).to_string(),
            ));
        }
        check_config_shape("initial covariance P", &p0, (self.n, self.n))?;
        self.x = x0;
        self.p = p0;
        Ok(())
    }

    pub fn state(&self) -> &StateVec {
        &self.x
    }

    pub fn covariance(&self) -> &StateMat {
        &self.p
    }

    pub fn state_dim(&self) -> usize {
        self.n
    }

    pub fn measurement_dim(&self) -> usize {
        self.m
    }

    pub fn transition(&self) -> &TransitionMat {
        &self.f
    }

    pub fn observation(&self) -> &ObservationMat {
        &self.h
    }

    pub fn control(&self) -> Option<&ControlMat> {
        self.b.as_ref()
    }

    pub fn process_noise(&self) -> &ProcessNoiseMat {
        &self.q
    }

    pub fn measurement_noise(&self) -> &MeasurementNoiseMat {
        &self.r
    }

    pub fn snapshot(&self) -> KalmanState {
        KalmanState {
            state: self.x.iter().copied().collect(),
            covariance: self.p.clone(),
            covariance_trace: self.p.trace(),
            predict_count: self.predict_count,
            update_count: self.update_count,
        }
    }
}
