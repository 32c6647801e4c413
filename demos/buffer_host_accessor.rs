//! Doubles sixteen integers in place, then reads them back through a host
//! accessor while the buffer is still alive.

use kestrel_rs::prelude::*;

const N: usize = 16;

fn main() -> Result<()> {
    env_logger::init();

    let queue = Queue::new()?;
    println!("Device: {}", queue.device().name());

    let mut data: Vec<i32> = (0..N as i32).collect();
    let buf = Buffer::from_slice(&mut data);

    queue.submit(|h| {
        let a = buf.read_write(h);
        h.parallel_for(N, move |item| a.update(item.id(), |x| x * 2));
    })?;

    // blocks until the kernel above has finished
    let host = buf.host_read()?;
    for value in host.to_vec() {
        println!("{}", value);
    }
    drop(host);

    buf.release()?;
    println!("last element after write-back: {}", data[N - 1]);
    Ok(())
}
