//! Work-group launch over shared memory.

use kestrel_rs::prelude::*;

const N: usize = 256;
const WORK_GROUP_SIZE: usize = 64;

fn main() -> Result<()> {
    env_logger::init();

    let queue = Queue::new()?;
    let data = queue.malloc_shared::<i32>(N)?;
    for i in 0..N {
        data.set(i, i as i32);
    }

    let d = data.clone();
    queue
        .parallel_for_nd(N, WORK_GROUP_SIZE, move |item| {
            d.update(item.global_id(), |x| x * 2);
        })?
        .wait()?;

    for i in 0..4 {
        println!("{}", data.get(i));
    }

    // a group size that does not divide the range is rejected up front
    if let Err(err) = queue.parallel_for_nd(100, WORK_GROUP_SIZE, |_| {}) {
        println!("rejected: {}", err);
    }

    queue.free(data);
    Ok(())
}
