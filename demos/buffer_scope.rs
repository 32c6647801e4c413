//! The buffer goes out of scope without any explicit wait; dropping it
//! synchronizes the host vector.

use kestrel_rs::prelude::*;

const N: usize = 16;

fn main() -> Result<()> {
    env_logger::init();

    let queue = Queue::new()?;
    println!("Device: {}", queue.device().name());

    let mut v: Vec<i32> = (0..N as i32).collect();
    {
        let buf = Buffer::from_slice(&mut v);
        queue.submit(|h| {
            let a = buf.read_write(h);
            h.parallel_for(N, move |item| a.update(item.id(), |x| x * 2));
        })?;
    } // write-back happens here

    for value in &v {
        println!("{}", value);
    }
    Ok(())
}
