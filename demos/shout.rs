//! Shouting pipeline
//!
//! Reads stdin, uppercases it through a two-stage pipeline, strips anything
//! that is not printable ASCII or a newline, and writes the result to stdout.
//!
//! Usage: cargo run --example shout < some_file.txt

use bytepipe::{FilterStage, MapStage, PipelineBuilder};
use std::io::{self, Read, Write};

fn main() -> io::Result<()> {
    let (head, tail) = PipelineBuilder::new(1)
        .stage(1, MapStage::new("upper", |rec: &[u8]| {
            vec![rec[0].to_ascii_uppercase()]
        }))
        .stage(1, FilterStage::new("printable", |rec: &[u8]| {
            rec[0] == b'\n' || (b' '..=b'~').contains(&rec[0])
        }))
        .bounded(4096)
        .build()
        .expect("pipeline construction failed");

    let feeder = std::thread::spawn(move || -> io::Result<()> {
        let mut chunk = [0u8; 4096];
        let mut stdin = io::stdin();
        loop {
            let n = stdin.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            head.push(&chunk[..n]);
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut buf = [0u8; 1024];
    loop {
        let got = tail.pop(&mut buf);
        if got == 0 {
            break;
        }
        out.write_all(&buf[..got])?;
    }

    feeder.join().expect("stdin reader panicked")?;
    Ok(())
}
