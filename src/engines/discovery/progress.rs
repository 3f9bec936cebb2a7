use super::search::ProgressCallback;
use log::info;

pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_depth_start(&mut self, depth: usize, frontier: &[String]) {
        info!("Depth {} starting, expanding {:?}", depth, frontier);
    }

    fn on_depth_complete(&mut self, depth: usize, best_score: f64, explored: usize) {
        info!(
            "Depth {} complete. Best score: {:.4}, kernels explored: {}",
            depth, best_score, explored
        );
    }

    fn on_kernel_evaluated(&mut self, key: &str, score: f64, current: usize, total: usize) {
        if current % 10 == 0 || current == total {
            info!("  Evaluated {}/{} kernels (last: {} = {:.3})", current, total, key, score);
        }
    }
}

// For reporting to another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    DepthStart { depth: usize, frontier: Vec<String> },
    DepthComplete { depth: usize, best_score: f64, explored: usize },
    KernelEvaluated { key: String, score: f64, current: usize, total: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_depth_start(&mut self, depth: usize, frontier: &[String]) {
        let _ = self.sender.send(ProgressMessage::DepthStart {
            depth,
            frontier: frontier.to_vec(),
        });
    }

    fn on_depth_complete(&mut self, depth: usize, best_score: f64, explored: usize) {
        let _ = self.sender.send(ProgressMessage::DepthComplete {
            depth,
            best_score,
            explored,
        });
    }

    fn on_kernel_evaluated(&mut self, key: &str, score: f64, current: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::KernelEvaluated {
            key: key.to_string(),
            score,
            current,
            total,
        });
    }
}
