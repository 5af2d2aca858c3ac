use crate::models::FoodRecord;
use crate::services::recommender::{LoadOutcome, Recommender, RecommenderState, Snapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 32;

enum Command {
    Load {
        query: String,
        train: bool,
        reply: oneshot::Sender<LoadOutcome>,
    },
    Train {
        reply: oneshot::Sender<bool>,
    },
}

/// Background task running load/train jobs off the caller's control loop.
///
/// A new load aborts every job still in flight; the aborted callers get
/// `LoadOutcome::Cancelled` / `false`.
pub struct RecommenderWorker {
    recommender: Arc<Recommender>,
    commands: mpsc::Receiver<Command>,
    in_flight: Vec<JoinHandle<()>>,
}

impl RecommenderWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(recommender: Arc<Recommender>) -> RecommenderHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = Self {
            recommender: Arc::clone(&recommender),
            commands: rx,
            in_flight: Vec::new(),
        };
        tokio::spawn(worker.run());

        RecommenderHandle {
            commands: tx,
            recommender,
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.in_flight.retain(|job| !job.is_finished());

            match command {
                Command::Load {
                    query,
                    train,
                    reply,
                } => {
                    self.cancel_in_flight();
                    let recommender = Arc::clone(&self.recommender);
                    self.in_flight.push(tokio::spawn(async move {
                        let outcome = recommender.load_with_outcome(&query).await;
                        if train && outcome.is_loaded() {
                            recommender.train().await;
                        }
                        let _ = reply.send(outcome);
                    }));
                }
                Command::Train { reply } => {
                    let recommender = Arc::clone(&self.recommender);
                    self.in_flight.push(tokio::spawn(async move {
                        let _ = reply.send(recommender.train().await);
                    }));
                }
            }
        }

        debug!("Recommender worker stopped: all handles dropped");
    }

    fn cancel_in_flight(&mut self) {
        let pending = self.in_flight.len();
        for job in self.in_flight.drain(..) {
            job.abort();
        }
        if pending > 0 {
            info!("Cancelled {} in-flight job(s) for a newer load", pending);
        }
    }
}

/// Cloneable front end to the worker. Load/train go through the worker,
/// queries read the current snapshot directly.
#[derive(Clone)]
pub struct RecommenderHandle {
    commands: mpsc::Sender<Command>,
    recommender: Arc<Recommender>,
}

impl RecommenderHandle {
    pub async fn load(&self, query: impl Into<String>) -> LoadOutcome {
        self.submit_load(query.into(), false).await
    }

    /// Load then train in one job
    pub async fn load_and_train(&self, query: impl Into<String>) -> LoadOutcome {
        self.submit_load(query.into(), true).await
    }

    pub async fn train(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Train { reply }).await.is_err() {
            warn!("Train rejected: worker is not running");
            return false;
        }
        rx.await.unwrap_or(false)
    }

    async fn submit_load(&self, query: String, train: bool) -> LoadOutcome {
        let (reply, rx) = oneshot::channel();
        let command = Command::Load {
            query,
            train,
            reply,
        };
        if self.commands.send(command).await.is_err() {
            warn!("Load rejected: worker is not running");
            return LoadOutcome::Cancelled;
        }
        rx.await.unwrap_or(LoadOutcome::Cancelled)
    }

    /// False once the worker task has stopped
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub fn recommender(&self) -> &Arc<Recommender> {
        &self.recommender
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.recommender.snapshot()
    }

    pub fn state(&self) -> RecommenderState {
        self.recommender.state()
    }

    pub fn filter_by_goal(&self, goal: &str, allergies: &[String]) -> Vec<FoodRecord> {
        self.recommender.filter_by_goal(goal, allergies)
    }

    pub fn find_similar(&self, query: &str, top_n: usize) -> Vec<FoodRecord> {
        self.recommender.find_similar(query, top_n)
    }

    pub fn get_cluster_foods(&self, query: &str) -> Vec<FoodRecord> {
        self.recommender.get_cluster_foods(query)
    }
}
