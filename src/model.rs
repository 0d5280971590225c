#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub name: String,
    pub capacity: usize,
    pub pending_tasks: usize,
    pub live_workers: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub panicked_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.live_workers as f64 / self.capacity as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        self.pending_tasks as f64
    }

    pub fn success_rate(&self) -> f64 {
        if self.completed_tasks == 0 {
            return 1.0;
        }
        self.completed_tasks.saturating_sub(self.panicked_tasks) as f64 / self.completed_tasks as f64
    }
}
