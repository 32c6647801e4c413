//! Two independent updates on two buffers, then a third kernel that reads
//! both. The third submission is ordered after the first two purely from
//! its declared accesses.

use kestrel_rs::prelude::*;

const N: usize = 4;

fn main() -> Result<()> {
    env_logger::init();

    let queue = Queue::new()?;
    println!("Device: {}", queue.device().name());

    let mut v1 = vec![10; N];
    let mut v2 = vec![10; N];
    {
        let buf1 = Buffer::from_slice(&mut v1);
        let buf2 = Buffer::from_slice(&mut v2);

        queue.submit(|h| {
            let a = buf1.read_write(h);
            h.parallel_for(N, move |item| a.update(item.id(), |x| x + 2));
        })?;
        queue.submit(|h| {
            let a = buf2.read_write(h);
            h.parallel_for(N, move |item| a.update(item.id(), |x| x + 3));
        })?;

        let combine = queue.submit(|h| {
            let a = buf1.read_write(h);
            let b = buf2.read(h);
            h.parallel_for(N, move |item| a.update(item.id(), |x| x + b.get(item.id())));
        })?;
        for dep in combine.dependencies() {
            println!("{} waits on {} ({:?})", combine.id(), dep.task, dep.kind);
        }
        combine.wait()?;
    }

    for value in &v1 {
        println!("{}", value);
    }

    let metrics = queue.metrics();
    println!(
        "\nsubmitted: {}, completed: {}, inferred edges: {}",
        metrics.tasks_submitted,
        metrics.tasks_completed,
        metrics.edges.total()
    );
    Ok(())
}
