//! Stress tests for the kestrel runtime

use kestrel_rs::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

fn queue(threads: usize) -> Queue {
    let _ = env_logger::builder().is_test(true).try_init();
    Queue::with_config(Config::builder().num_threads(threads).build().unwrap()).unwrap()
}

#[test]
fn stress_test_concurrent_submitters_share_buffers() {
    let q = queue(4);
    let buffers: Vec<Buffer<'static, u64>> = (0..4).map(|_| Buffer::new(vec![0; 256])).collect();

    std::thread::scope(|s| {
        for t in 0..4usize {
            let q = &q;
            let buffers = &buffers;
            s.spawn(move || {
                for round in 0..50usize {
                    // touch two buffers, locked in whatever order they come
                    let a = &buffers[(t + round) % 4];
                    let b = &buffers[(t + round + 1) % 4];
                    q.submit(|h| {
                        let src = b.read(h);
                        let dst = a.read_write(h);
                        h.parallel_for(256, move |item| {
                            let _ = src.get(item.id());
                            dst.update(item.id(), |x| x + 1);
                        });
                    })
                    .unwrap();
                }
            });
        }
    });

    q.wait().unwrap();

    let total: u64 = buffers
        .into_iter()
        .map(|b| b.into_vec().unwrap().into_iter().sum::<u64>())
        .sum();
    assert_eq!(total, 4 * 50 * 256);
}

#[test]
fn stress_test_long_dependency_chain() {
    let q = queue(4);
    let buf = Buffer::new(vec![0u32; 64]);

    for _ in 0..500 {
        q.submit(|h| {
            let acc = buf.read_write(h);
            h.parallel_for(64, move |item| acc.update(item.id(), |x| x + 1));
        })
        .unwrap();
    }

    assert_eq!(buf.into_vec().unwrap(), vec![500; 64]);
}

#[test]
fn stress_test_deep_chain_behind_failed_writer() {
    let q = queue(2);
    let buf = Buffer::new(vec![0u8; 4]);
    let (tx, rx) = mpsc::channel::<()>();

    let head = q
        .submit(|h| {
            let acc = buf.write(h);
            h.single_task(move || {
                rx.recv_timeout(Duration::from_secs(10)).unwrap();
                acc.set(0, 1);
                panic!("writer failed");
            });
        })
        .unwrap();

    let mut last = None;
    for _ in 0..100_000 {
        last = Some(
            q.submit(|h| {
                let acc = buf.read_write(h);
                h.single_task(move || acc.update(0, |x| x + 1));
            })
            .unwrap(),
        );
    }
    let last = last.unwrap();

    tx.send(()).unwrap();
    assert_eq!(
        last.wait(),
        Err(Error::DependencyFailed {
            task: last.id(),
            failed: head.id(),
        })
    );
    assert!(q.wait().is_err());
    assert!(buf.release().is_err());
}

#[test]
fn stress_test_deep_chain_of_empty_launches() {
    let q = queue(2);
    let buf = Buffer::new(vec![0u8; 4]);
    let (tx, rx) = mpsc::channel::<()>();

    q.submit(|h| {
        let acc = buf.write(h);
        h.single_task(move || {
            rx.recv_timeout(Duration::from_secs(10)).unwrap();
            acc.set(0, 7);
        });
    })
    .unwrap();

    let mut last = None;
    for _ in 0..100_000 {
        last = Some(
            q.submit(|h| {
                let acc = buf.read_write(h);
                h.parallel_for(0, move |item| acc.set(item.id(), 0));
            })
            .unwrap(),
        );
    }

    tx.send(()).unwrap();
    last.unwrap().wait().unwrap();
    q.wait().unwrap();
    assert_eq!(buf.into_vec().unwrap(), vec![7, 0, 0, 0]);
}

#[test]
fn stress_test_many_independent_groups() {
    let q = queue(4);
    let counter = Arc::new(Mutex::new(0usize));

    let start = Instant::now();
    for _ in 0..1000 {
        let counter = counter.clone();
        q.single_task(move || {
            *counter.lock() += 1;
        })
        .unwrap();
    }
    q.wait().unwrap();
    let duration = start.elapsed();

    assert_eq!(*counter.lock(), 1000);
    println!("1000 single tasks: {:?}", duration);
}

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_large_nd_range() {
    let q = queue(num_cpus::get().max(2));
    let n = 1 << 22;
    let data = q.malloc_shared::<f32>(n).unwrap();

    let d = data.clone();
    q.parallel_for_nd(n, 256, move |item| {
        d.set(item.global_id(), item.local_id() as f32);
    })
    .unwrap()
    .wait()
    .unwrap();

    assert_eq!(data.get(n - 1), 255.0);
    let snapshot = q.metrics();
    assert_eq!(snapshot.chunks_executed, (n / 256) as u64);
}

#[test]
fn stress_test_queue_drop_waits_for_everything() {
    let visited = Arc::new(AtomicUsize::new(0));
    {
        let q = queue(2);
        for _ in 0..20 {
            let v = visited.clone();
            q.parallel_for(1024, move |_| {
                v.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        }
    }

    // every submission must have run before the queue went away
    assert_eq!(visited.load(Ordering::Relaxed), 20 * 1024);
}
