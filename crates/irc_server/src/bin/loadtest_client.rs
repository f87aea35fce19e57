//! A synchronous stand-in for the teacher's async stress-test client: spawns
//! many simulated clients against a running server and has each post to a
//! shared channel on an interval. One OS thread per client since this
//! binary has no async runtime in its dependency stack.

use std::io::{self, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

const SERVER_ADDR: &str = "127.0.0.1:6667";
const NUM_CLIENTS: usize = 200;
const INTERVAL: Duration = Duration::from_millis(1000);
const SPAWN_STAGGER: Duration = Duration::from_millis(5);

fn main() {
    println!("Starting stress test: {NUM_CLIENTS} clients...");

    let mut handles = Vec::with_capacity(NUM_CLIENTS);
    for i in 0..NUM_CLIENTS {
        handles.push(thread::spawn(move || {
            if let Err(e) = run_client(i, SERVER_ADDR) {
                eprintln!("client {i} error: {e}");
            }
        }));
        thread::sleep(SPAWN_STAGGER);
    }

    for handle in handles {
        let _ = handle.join();
    }
}

fn run_client(id: usize, addr: &str) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr)?;
    let nick = format!("bot{id}");

    let login = format!("NICK {nick}\r\nUSER {nick} 0 * :LoadTester\r\n");
    stream.write_all(login.as_bytes())?;
    stream.write_all(b"JOIN #stress_test\r\n")?;

    let mut count = 0usize;
    loop {
        thread::sleep(INTERVAL);
        let msg = format!("PRIVMSG #stress_test :Message from {nick} - Load Testing...{count}\r\n");
        count += 1;
        if stream.write_all(msg.as_bytes()).is_err() {
            break;
        }
    }
    Ok(())
}
