//! Bistatic range/Doppler measurement model
//!
//! The Doppler convention lives here and nowhere else: the synthetic
//! generator and the solver both call [`bistatic_doppler_hz`].

use crate::algorithms::geodesy::{enu_to_ecef_rotation, LocalFrame};
use crate::core::{Ecef, TargetState, HZ_PER_MHZ, METERS_PER_KM};
use nalgebra::DVector;

/// Predicted bistatic range in km: IoO to target plus target to sensor
pub fn bistatic_range_km(sensor: &Ecef, ioo: &Ecef, target: &Ecef) -> f64 {
    (ioo.distance_to(target) + target.distance_to(sensor)) / METERS_PER_KM
}

/// Predicted Doppler shift in Hz.
///
/// `-(f / c) * (v . u_ioo_to_target + v . u_target_to_sensor)`, with the unit
/// vectors and the velocity all in ECEF. The leading minus is the
/// direct-minus-reflected frequency convention and is applied exactly once.
pub fn bistatic_doppler_hz(
    sensor: &Ecef,
    ioo: &Ecef,
    target: &Ecef,
    velocity: &Ecef,
    freq_hz: f64,
    speed_of_light_m_s: f64,
) -> f64 {
    let u_ioo_to_target = ioo.direction_to(target);
    let u_target_to_sensor = target.direction_to(sensor);

    let projected = velocity.dot(&u_ioo_to_target) + velocity.dot(&u_target_to_sensor);
    -(freq_hz / speed_of_light_m_s) * projected
}

/// Sensor/IoO pair with the carrier it observes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BistaticLink {
    pub sensor: Ecef,
    pub ioo: Ecef,
    pub freq_hz: f64,
}

impl BistaticLink {
    pub fn new(sensor: Ecef, ioo: Ecef, freq_mhz: f64) -> Self {
        Self {
            sensor,
            ioo,
            freq_hz: freq_mhz * HZ_PER_MHZ,
        }
    }

    /// Sensor-to-IoO distance in meters
    pub fn baseline_m(&self) -> f64 {
        self.sensor.distance_to(&self.ioo)
    }

    pub fn range_km(&self, target: &Ecef) -> f64 {
        bistatic_range_km(&self.sensor, &self.ioo, target)
    }

    pub fn doppler_hz(&self, target: &Ecef, velocity: &Ecef, speed_of_light_m_s: f64) -> f64 {
        bistatic_doppler_hz(
            &self.sensor,
            &self.ioo,
            target,
            velocity,
            self.freq_hz,
            speed_of_light_m_s,
        )
    }
}

/// Range/Doppler pair, measured or predicted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub range_km: f64,
    pub doppler_hz: f64,
}

/// A link together with what was measured on it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub link: BistaticLink,
    pub measured: Measurement,
}

/// Target kinematics expressed in ECEF
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcefKinematics {
    pub position: Ecef,
    pub velocity: Ecef,
}

/// Evaluates predictions and residuals for a candidate state in one triple's frame
#[derive(Debug, Clone)]
pub struct MeasurementModel {
    frame: LocalFrame,
    observations: Vec<Observation>,
    speed_of_light_m_s: f64,
}

impl MeasurementModel {
    pub fn new(frame: LocalFrame, observations: Vec<Observation>, speed_of_light_m_s: f64) -> Self {
        Self {
            frame,
            observations,
            speed_of_light_m_s,
        }
    }

    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Length of the residual vector
    pub fn residual_count(&self) -> usize {
        2 * self.observations.len()
    }

    /// Map a local state into ECEF.
    ///
    /// The velocity is rotated at the target's own latitude/longitude, which is
    /// recovered from its ECEF position on every call.
    pub fn to_ecef(&self, state: &TargetState) -> EcefKinematics {
        let position = self.frame.local_to_ecef(&state.position);
        let location = self.frame.ellipsoid().ecef_to_geodetic(&position);
        let velocity = enu_to_ecef_rotation(location.lat, location.lon).apply(&state.velocity);
        EcefKinematics { position, velocity }
    }

    pub fn predict(&self, state: &TargetState) -> Vec<Measurement> {
        let target = self.to_ecef(state);
        self.observations
            .iter()
            .map(|obs| Measurement {
                range_km: obs.link.range_km(&target.position),
                doppler_hz: obs.link.doppler_hz(&target.position, &target.velocity, self.speed_of_light_m_s),
            })
            .collect()
    }

    /// Measured minus predicted, range and Doppler interleaved per observation
    pub fn residuals(&self, state: &TargetState) -> DVector<f64> {
        let predicted = self.predict(state);
        let mut residuals = DVector::zeros(self.residual_count());
        for (i, (obs, pred)) in self.observations.iter().zip(predicted.iter()).enumerate() {
            residuals[2 * i] = obs.measured.range_km - pred.range_km;
            residuals[2 * i + 1] = obs.measured.doppler_hz - pred.doppler_hz;
        }
        residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Ellipsoid, Enu, EnuToEcef, Geodetic, SPEED_OF_LIGHT_M_S};
    use approx::assert_abs_diff_eq;

    fn surface(ellipsoid: &Ellipsoid, lat: f64, lon: f64) -> Ecef {
        ellipsoid.lla_to_ecef(lat, lon, 0.0)
    }

    fn fixture_model(truth: &TargetState) -> MeasurementModel {
        let wgs84 = Ellipsoid::wgs84();
        let frame = LocalFrame::new(wgs84, Geodetic::surface(34.0067, -117.96));
        let a = surface(&wgs84, 34.10, -118.10);
        let b = surface(&wgs84, 33.90, -117.80);
        let links = [
            BistaticLink::new(surface(&wgs84, 34.00, -118.00), a, 100.0),
            BistaticLink::new(surface(&wgs84, 34.05, -117.95), a, 100.0),
            BistaticLink::new(surface(&wgs84, 33.97, -117.93), b, 100.0),
        ];

        let unmeasured: Vec<Observation> = links
            .iter()
            .map(|link| Observation {
                link: *link,
                measured: Measurement { range_km: 0.0, doppler_hz: 0.0 },
            })
            .collect();
        let model = MeasurementModel::new(frame, unmeasured, SPEED_OF_LIGHT_M_S);

        let observations = links
            .iter()
            .zip(model.predict(truth))
            .map(|(link, measured)| Observation { link: *link, measured })
            .collect();
        MeasurementModel::new(frame, observations, SPEED_OF_LIGHT_M_S)
    }

    #[test]
    fn test_range_is_sum_of_legs() {
        let ioo = Ecef::new(0.0, 0.0, 0.0);
        let target = Ecef::new(3000.0, 4000.0, 0.0);
        let sensor = Ecef::new(3000.0, 4000.0, 12000.0);
        assert_abs_diff_eq!(bistatic_range_km(&sensor, &ioo, &target), 17.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stationary_target_has_no_doppler() {
        let doppler = bistatic_doppler_hz(
            &Ecef::new(0.0, 0.0, 0.0),
            &Ecef::new(10_000.0, 0.0, 0.0),
            &Ecef::new(5000.0, 5000.0, 3000.0),
            &Ecef::zeros(),
            100e6,
            SPEED_OF_LIGHT_M_S,
        );
        assert_eq!(doppler, 0.0);
    }

    #[test]
    fn test_zero_residual_at_truth() {
        let truth = TargetState::new(Enu::new(11_000.0, 16_000.0, 8000.0), Enu::new(150.0, -80.0, 5.0));
        let model = fixture_model(&truth);

        let residuals = model.residuals(&truth);
        assert_eq!(residuals.len(), 6);
        assert_abs_diff_eq!(residuals.norm(), 0.0, epsilon = 1e-9);

        // Shifting the target moves the range residuals
        let moved = TargetState::new(truth.position + Enu::new(500.0, 0.0, 0.0), truth.velocity);
        assert!(model.residuals(&moved).norm() > 1e-3);
    }

    #[test]
    fn test_residual_layout_is_interleaved() {
        let truth = TargetState::new(Enu::new(5000.0, 9000.0, 6000.0), Enu::new(100.0, 100.0, 0.0));
        let model = fixture_model(&truth);

        // Velocity only touches the Doppler slots
        let faster = TargetState::new(truth.position, truth.velocity * 2.0);
        let residuals = model.residuals(&faster);
        for i in 0..3 {
            assert_abs_diff_eq!(residuals[2 * i], 0.0, epsilon = 1e-12);
            assert!(residuals[2 * i + 1].abs() > 1e-6);
        }
    }

    #[test]
    fn test_doppler_sign_convention() {
        let wgs84 = Ellipsoid::wgs84();
        let frame = LocalFrame::new(wgs84, Geodetic::surface(0.0, 0.0));
        let link = BistaticLink::new(surface(&wgs84, 0.0, 0.0), surface(&wgs84, 0.0, -0.2), 100.0);
        let observation = Observation {
            link,
            measured: Measurement { range_km: 0.0, doppler_hz: 0.0 },
        };
        let model = MeasurementModel::new(frame, vec![observation], SPEED_OF_LIGHT_M_S);
        let position = frame.geodetic_to_local(&Geodetic::new(0.045, 0.09, 3000.0));

        // Heading east, away from the illuminator faster than towards the sensor
        let receding = model.predict(&TargetState::new(position, Enu::new(200.0, 0.0, 0.0)));
        assert!(receding[0].doppler_hz < 0.0);

        let approaching = model.predict(&TargetState::new(position, Enu::new(-200.0, 0.0, 0.0)));
        assert!(approaching[0].doppler_hz > 0.0);
        assert_abs_diff_eq!(approaching[0].doppler_hz, -receding[0].doppler_hz, epsilon = 1e-9);
    }

    #[test]
    fn test_velocity_rotated_at_target_location() {
        let wgs84 = Ellipsoid::wgs84();
        let frame = LocalFrame::new(wgs84, Geodetic::surface(0.0, 0.0));
        let model = MeasurementModel::new(frame, Vec::new(), SPEED_OF_LIGHT_M_S);

        // Two degrees east of the origin the local "up" axis has tilted
        let position = frame.geodetic_to_local(&Geodetic::new(0.0, 2.0, 1000.0));
        let kinematics = model.to_ecef(&TargetState::new(position, Enu::new(0.0, 0.0, 100.0)));

        let expected = EnuToEcef::at(0.0, 2.0).apply(&Enu::new(0.0, 0.0, 100.0));
        assert_abs_diff_eq!(kinematics.velocity.0, expected.0, epsilon = 1e-6);
        assert!(kinematics.velocity.0.y > 1.0);
    }
}
