//! A single task walking a small shared allocation.

use kestrel_rs::prelude::*;

const N: usize = 4;

fn main() -> Result<()> {
    env_logger::init();

    let queue = Queue::new()?;
    let data = queue.malloc_shared::<i32>(N)?;
    for i in 0..N {
        data.set(i, i as i32);
    }

    let d = data.clone();
    queue
        .single_task(move || {
            for i in 0..N {
                d.update(i, |x| x * 2);
            }
        })?
        .wait()?;

    for value in data.to_vec() {
        println!("{}", value);
    }

    queue.free(data);
    Ok(())
}
