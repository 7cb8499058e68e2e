//! Convert any readable input back into a plain text edge list

use gmio::{Coo, Flags};
use std::time::Instant;

fn main() -> gmio::Result<()> {
    let mut args = std::env::args().skip(1);
    let (input, output) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            eprintln!("usage: to_edge_list <input> <output.el>");
            std::process::exit(2);
        }
    };

    let start = Instant::now();
    let coo = Coo::<u32, u64, f32>::from_file(&input, Flags::plain())?;
    println!(
        "loaded {} entries over {} labels in {:?}",
        coo.m(),
        coo.n(),
        start.elapsed()
    );

    let start = Instant::now();
    coo.write_edge_list(&output)?;
    println!("edge list written to {output} in {:?}", start.elapsed());
    Ok(())
}
