use gol_studio::*;

fn main() {
    let engines: Vec<Box<dyn LifeEngine>> =
        vec![Box::new(ScalarEngine::new()), Box::new(SIMDEngine::new())];

    for (rows, cols, steps) in [(150, 300, 1000), (1024, 1024, 100), (4096, 4096, 10)] {
        let grid = Grid::random(rows, cols, 0.3, Some(42)).unwrap();
        println!("grid={rows}x{cols}\tsteps={steps}");

        let mut hashes = vec![];
        for engine in engines.iter() {
            let timer = std::time::Instant::now();
            let result = engine.advance(&grid, steps);
            let elapsed = timer.elapsed();
            println!(
                "{:>8} -> {:.3} secs ({:.1} steps/sec)",
                engine.name(),
                elapsed.as_secs_f64(),
                steps as f64 / elapsed.as_secs_f64()
            );
            hashes.push((result.liveness_hash(), result.max_age()));
        }
        assert!(hashes.windows(2).all(|w| w[0] == w[1]), "Engines disagree");
    }
}
