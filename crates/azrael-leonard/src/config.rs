use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LeonardConfig {
    /// Target duration of one tick; also the `dt` handed to workers.
    pub tick_interval: Duration,
    /// Substep cap forwarded to the integrator.
    pub max_substeps: u32,
    /// How long to wait for worker results before cancelling the remaining
    /// packages of a tick.
    pub wp_deadline: Duration,
    /// Commit attempts before a tick's results are dropped.
    pub commit_retries: u32,
    /// Backoff between commit attempts.
    pub commit_backoff: Duration,
}

impl Default for LeonardConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            max_substeps: 60,
            wp_deadline: Duration::from_millis(250),
            commit_retries: 3,
            commit_backoff: Duration::from_millis(20),
        }
    }
}
