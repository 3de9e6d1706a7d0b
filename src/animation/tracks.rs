use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// Keyed values over time, kept sorted by time.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f64>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(interpolation: InterpolationMode) -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            interpolation,
        }
    }

    /// Sets a key, replacing any key already at `time`.
    pub fn insert_key(&mut self, time: f64, value: T) {
        let index = self.times.partition_point(|&t| t < time);
        if self.times.get(index).is_some_and(|&t| (t - time).abs() < f64::EPSILON) {
            self.values[index] = value;
        } else {
            self.times.insert(index, time);
            self.values.insert(index, value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Value at an exact key time.
    #[must_use]
    pub fn key_at(&self, time: f64) -> Option<T> {
        let index = self.times.iter().position(|&t| (t - time).abs() < f64::EPSILON)?;
        self.values.get(index).copied()
    }

    /// Samples the track, holding the first and last values outside the keyed range.
    ///
    /// Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, time: f64) -> Option<T> {
        // partition_point finds the first index where t > time, i.e. next_index
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return self.values.first().copied();
        }
        let index = next - 1;
        if next >= self.times.len() {
            return self.values.get(index).copied();
        }

        let (t0, t1) = (self.times[index], self.times[next]);
        let dt = t1 - t0;
        let t = if dt > 1e-9 { ((time - t0) / dt).clamp(0.0, 1.0) } else { 0.0 };

        match self.interpolation {
            InterpolationMode::Step => Some(self.values[index]),
            InterpolationMode::Linear => Some(T::interpolate_linear(self.values[index], self.values[next], t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_stay_sorted_and_replace_in_place() {
        let mut track = KeyframeTrack::<f64>::new(InterpolationMode::Linear);
        track.insert_key(2.0, 20.0);
        track.insert_key(0.0, 0.0);
        track.insert_key(2.0, 40.0);
        assert_eq!(track.times, vec![0.0, 2.0]);
        assert_eq!(track.key_at(2.0), Some(40.0));
        assert_eq!(track.sample(1.0), Some(20.0));
    }

    #[test]
    fn step_holds_previous_key() {
        let mut track = KeyframeTrack::<f64>::new(InterpolationMode::Step);
        track.insert_key(0.0, 1.0);
        track.insert_key(1.0, 5.0);
        assert_eq!(track.sample(0.9), Some(1.0));
        assert_eq!(track.sample(3.0), Some(5.0));
        assert_eq!(track.sample(-1.0), Some(1.0));
    }

    #[test]
    fn empty_track_samples_nothing() {
        let track = KeyframeTrack::<f64>::new(InterpolationMode::Linear);
        assert!(track.sample(0.0).is_none());
    }
}
