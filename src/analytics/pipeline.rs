//! 点击管道
//!
//! 有界 mpsc 通道 + worker 池，承接响应后的点击事件。
//! 通道满时丢弃事件并计数：响应路径永不因下游拥塞阻塞，
//! 代价是跟踪保真度下降，这是正确的取舍。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::writer::ClickLogWriter;
use super::{ClickEvent, ClickLogSink};

pub struct ClickPipeline {
    tx: mpsc::Sender<ClickEvent>,
    /// 通道满而丢弃的事件数（监控用）
    dropped: AtomicU64,
}

impl ClickPipeline {
    /// 启动管道：创建通道并 spawn worker 池
    pub fn start(
        sink: Arc<dyn ClickLogSink>,
        capacity: usize,
        workers: usize,
        write_batch_size: usize,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<ClickEvent>(capacity);
        let rx = Arc::new(Mutex::new(rx));
        let writer = Arc::new(ClickLogWriter::new(sink));

        let worker_count = workers.max(1);
        for worker_id in 0..worker_count {
            let rx = Arc::clone(&rx);
            let writer = Arc::clone(&writer);
            tokio::spawn(async move {
                Self::worker_loop(worker_id, rx, writer, write_batch_size.max(1)).await;
            });
        }

        info!(
            "Click pipeline started: capacity={}, workers={}, batch={}",
            capacity, worker_count, write_batch_size
        );

        Arc::new(Self {
            tx,
            dropped: AtomicU64::new(0),
        })
    }

    /// worker：取一个事件后尽量凑满一批再写
    async fn worker_loop(
        worker_id: usize,
        rx: Arc<Mutex<mpsc::Receiver<ClickEvent>>>,
        writer: Arc<ClickLogWriter>,
        batch_size: usize,
    ) {
        loop {
            let batch = {
                let mut rx = rx.lock().await;
                let Some(first) = rx.recv().await else {
                    // 通道关闭，worker 退出
                    debug!("Click pipeline worker {} exiting", worker_id);
                    return;
                };
                let mut batch = Vec::with_capacity(batch_size);
                batch.push(first);
                while batch.len() < batch_size {
                    match rx.try_recv() {
                        Ok(event) => batch.push(event),
                        Err(_) => break,
                    }
                }
                batch
            };

            writer.write_batch(batch).await;
        }
    }

    /// 非阻塞提交
    ///
    /// 通道满或已关闭时返回 false 并丢弃事件。
    pub fn submit(&self, event: ClickEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Click pipeline full/closed, event dropped (total dropped: {}): {}",
                    total, e
                );
                false
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
