pub const FPS_HISTORY_SIZE: usize = 5;
pub const FPS_INTERVAL_MS: u64 = 1000;

/// Rolling frame-rate estimate.
///
/// Frames are counted per fixed interval. Each completed interval is pushed
/// into a short history; the highest and lowest samples are discarded and
/// the rest averaged. Nothing is published until three samples exist.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    previous_ticks: Option<u64>,
    history: [Option<u32>; FPS_HISTORY_SIZE],
    frames_counted: u32,
    average: f64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published average, or zero before the first publication.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Record one frame at `current_ticks` and return a freshly published
    /// average, if this frame closed an interval with enough history.
    pub fn update(&mut self, current_ticks: u64) -> Option<f64> {
        let Some(previous) = self.previous_ticks else {
            self.previous_ticks = Some(current_ticks);
            self.frames_counted = 0;
            self.history = [None; FPS_HISTORY_SIZE];
            return None;
        };

        if current_ticks.saturating_sub(previous) < FPS_INTERVAL_MS {
            self.frames_counted += 1;
            return None;
        }

        self.history.rotate_right(1);
        self.history[0] = Some(self.frames_counted);
        self.previous_ticks = Some(previous + FPS_INTERVAL_MS);
        self.frames_counted = 0;

        let samples: Vec<u32> = self.history.iter().flatten().copied().collect();
        if samples.len() <= 2 {
            return None;
        }

        let max = samples.iter().copied().max().unwrap_or(0);
        let min = samples.iter().copied().min().unwrap_or(0);
        let total: u32 = samples.iter().sum::<u32>() - max - min;
        let average =
            f64::from(total) / (samples.len() - 2) as f64 * (1000.0 / FPS_INTERVAL_MS as f64);
        self.average = average;
        Some(average)
    }
}
