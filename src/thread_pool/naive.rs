use std::{
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
};

use crate::CacheError;

use super::ThreadPool;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool that spawns one OS thread per worker and never joins them
/// on drop; jobs are handed out over an `mpsc` channel shared by all workers.
pub struct NaiveThreadPool {
    sender: Sender<Job>,
}

impl ThreadPool for NaiveThreadPool {
    fn new(num_threads: usize) -> crate::Result<Self>
    where
        Self: Sized,
    {
        if num_threads == 0 {
            return Err(CacheError::Other(
                "num_threads must be greater than zero".to_owned(),
            ));
        }
        let (tx, rx) = channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        (0..num_threads).for_each(|_| {
            spawn_in_pool(rx.clone());
        });

        Ok(NaiveThreadPool { sender: tx })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(job)).unwrap()
    }
}

fn spawn_in_pool(job: Arc<Mutex<Receiver<Job>>>) {
    thread::spawn(move || loop {
        let msg = job.lock().unwrap().recv();
        match msg {
            Ok(job) => job(),
            Err(_) => break,
        }
    });
}
