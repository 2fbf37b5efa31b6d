#![no_main]

use libfuzzer_sys::fuzz_target;
use ingestrs::{ChunkConfig, Splitter};

fuzz_target!(|data: Vec<u8>| {
    let configs = [
        // Small chunks
        ChunkConfig::new(4, 16, 64).unwrap(),
        // Min equals max, every chunk forced
        ChunkConfig::new(32, 32, 32).unwrap(),
        // Medium chunks
        ChunkConfig::new(64, 256, 1024).unwrap(),
        // Large chunks
        ChunkConfig::new(256, 4096, 16384).unwrap(),
    ];

    for config in configs {
        let splitter = Splitter::new(config).unwrap();
        let ranges = splitter.split(&data);

        // Ranges are contiguous and cover the input exactly
        let mut expected_offset = 0u64;
        for (i, range) in ranges.iter().enumerate() {
            assert_eq!(range.offset, expected_offset);
            assert!(range.size > 0);
            assert!(range.size <= config.max_size() as u64);
            if i + 1 < ranges.len() {
                assert!(range.size >= config.min_size() as u64);
            }
            expected_offset = range.end();
        }
        assert_eq!(expected_offset, data.len() as u64);

        // Same input, same boundaries
        assert_eq!(ranges, splitter.split(&data));

        // The lazy iterator agrees with the collected form
        assert!(splitter.ranges(&data).eq(ranges.iter().copied()));
    }
});
