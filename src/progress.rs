use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe progress display for the parallel panel prerender. Workers
/// share one counter; every tick refreshes a single status line.
pub struct RenderProgress {
    total: usize,
    completed: AtomicUsize,
}

impl RenderProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Marks one panel pair done and refreshes the status line.
    pub fn tick(&self) -> io::Result<()> {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let percentage = if self.total > 0 {
            (done * 100) / self.total
        } else {
            0
        };
        print!("\r[Progressing] {}/{} ({}%)", done, self.total, percentage);
        io::stdout().flush()?;
        Ok(())
    }

    /// Finish progress display
    pub fn finish(&self) -> io::Result<()> {
        println!("\r[Progressing] {}/{} (100%)", self.total, self.total);
        io::stdout().flush()?;
        Ok(())
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

/// Format time as "xx h xx m xx.xxx s" format
pub fn format_time_used(elapsed: std::time::Duration) -> String {
    let total_secs = elapsed.as_secs_f64();
    let hours = (total_secs / 3600.0) as u64;
    let minutes = ((total_secs % 3600.0) / 60.0) as u64;
    let seconds = total_secs % 60.0;

    if hours > 0 {
        format!("[Time used] {:02} h {:02} m {:05.3} s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("[Time used] {:02} m {:05.3} s", minutes, seconds)
    } else {
        format!("[Time used] {:05.3} s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counter_is_shared_across_threads() {
        let progress = RenderProgress::new(8);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..2 {
                        progress.tick().unwrap();
                    }
                });
            }
        });
        assert_eq!(progress.completed(), 8);
    }

    #[test]
    fn test_format_time_used() {
        assert_eq!(format_time_used(Duration::from_millis(1500)), "[Time used] 1.500 s");
        assert_eq!(format_time_used(Duration::from_secs(61)), "[Time used] 01 m 1.000 s");
        assert_eq!(
            format_time_used(Duration::from_secs(3661)),
            "[Time used] 01 h 01 m 1.000 s"
        );
    }
}
