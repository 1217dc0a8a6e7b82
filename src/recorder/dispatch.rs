//! One-shot handoff of work onto the thread that owns rendering.
//!
//! Pixel readback and event-queue draining must run on the UI thread. The
//! caller posts a task and blocks on a single-slot channel for its result;
//! when the caller already is the UI thread the task runs inline.

use super::capture::{CaptureError, ScreenCapture};
use image::RgbaImage;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait UiDispatcher: Send + Sync {
    fn is_ui_thread(&self) -> bool;

    /// Queue a task on the UI thread without waiting for it.
    fn post(&self, task: Task) -> Result<(), CaptureError>;

    /// Block until every task queued before this call has run.
    fn drain(&self) -> Result<(), CaptureError> {
        run_on_ui(self, || ())
    }
}

/// Run `task` on the UI thread and wait for its result.
pub fn run_on_ui<D, T, F>(dispatcher: &D, task: F) -> Result<T, CaptureError>
where
    D: UiDispatcher + ?Sized,
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    if dispatcher.is_ui_thread() {
        return Ok(task());
    }

    let (tx, rx) = mpsc::sync_channel::<T>(1);
    dispatcher.post(Box::new(move || {
        // Receiver only goes away if the caller stopped waiting.
        let _ = tx.send(task());
    }))?;
    rx.recv().map_err(|_| CaptureError::Disconnected)
}

/// Treats the calling thread as the UI thread. For hosts that deliver events
/// and render on the same thread that drives the recorder.
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn is_ui_thread(&self) -> bool {
        true
    }

    fn post(&self, task: Task) -> Result<(), CaptureError> {
        task();
        Ok(())
    }
}

/// A dedicated thread that runs posted tasks in order.
pub struct UiThread {
    sender: Mutex<Option<Sender<Task>>>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl UiThread {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for task in rx {
                    task();
                }
                log::debug!("ui thread task queue closed");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            thread_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    /// Close the queue and wait for queued tasks to finish.
    pub fn shutdown(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("ui thread panicked");
            }
        }
    }
}

impl UiDispatcher for UiThread {
    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn post(&self, task: Task) -> Result<(), CaptureError> {
        let sender = self.sender.lock().map_err(|_| CaptureError::Disconnected)?;
        sender
            .as_ref()
            .ok_or(CaptureError::Disconnected)?
            .send(task)
            .map_err(|_| CaptureError::Disconnected)
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Screen capture whose readback runs on the UI thread.
pub struct UiThreadCapture<F> {
    dispatcher: Arc<dyn UiDispatcher>,
    render: Arc<F>,
}

impl<F> UiThreadCapture<F>
where
    F: Fn() -> Result<RgbaImage, CaptureError> + Send + Sync + 'static,
{
    pub fn new(dispatcher: Arc<dyn UiDispatcher>, render: F) -> Self {
        Self {
            dispatcher,
            render: Arc::new(render),
        }
    }
}

impl<F> ScreenCapture for UiThreadCapture<F>
where
    F: Fn() -> Result<RgbaImage, CaptureError> + Send + Sync + 'static,
{
    fn capture(&self) -> Result<RgbaImage, CaptureError> {
        let render = Arc::clone(&self.render);
        run_on_ui(self.dispatcher.as_ref(), move || render())?
    }
}
