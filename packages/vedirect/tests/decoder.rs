use vedirect::{
    ChecksumAccumulator, ChecksumCoverage, Decoder, DecoderConfig, Frame, Record, Snapshot, State,
    hex::Response,
};

const DELIMITERS: [u8; 4] = [b'\t', b'\r', b'\n', b':'];

/// Builds a block with device framing: every field preceded by CR LF.
fn block(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (label, value) in fields {
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(label.as_bytes());
        bytes.push(b'\t');
        bytes.extend_from_slice(value.as_bytes());
    }
    bytes.extend_from_slice(b"\r\nChecksum\t");
    bytes.push(checksum_for(&bytes));
    bytes
}

/// The byte that makes `bytes` sum to zero.
fn checksum_for(bytes: &[u8]) -> u8 {
    let mut sum = ChecksumAccumulator::new();
    sum.add_all(bytes);
    sum.sum().wrapping_neg()
}

/// Builds a HEX frame from its command nibble and payload.
fn hex(command: u8, payload: &[u8]) -> Vec<u8> {
    let sum = payload
        .iter()
        .fold(command, |sum, &byte| sum.wrapping_add(byte));
    let checksum = 0x55u8.wrapping_sub(sum);

    let mut frame = format!(":{command:X}");
    for byte in payload.iter().chain([&checksum]) {
        frame.push_str(&format!("{byte:02X}"));
    }
    frame.push('\n');
    frame.into_bytes()
}

fn decode(decoder: &mut Decoder, bytes: &[u8]) -> Vec<Frame> {
    decoder.frames(bytes.iter().copied()).collect()
}

fn expected(fields: &[(&str, &str)], checksum: u8) -> Record {
    fields
        .iter()
        .map(|(label, value)| vedirect::Field::new(*label, *value))
        .chain([vedirect::Field::new("Checksum", [checksum])])
        .collect()
}

const MPPT: &[(&str, &str)] = &[
    ("PID", "0xA053"),
    ("FW", "159"),
    ("SER#", "HQ2132ABCDE"),
    ("V", "13650"),
    ("I", "-10"),
    ("VPV", "18020"),
    ("PPV", "0"),
    ("CS", "3"),
    ("MPPT", "2"),
    ("OR", "0x00000000"),
    ("ERR", "0"),
    ("LOAD", "ON"),
    ("IL", "300"),
    ("H19", "1234"),
    ("H20", "12"),
    ("H21", "87"),
    ("H22", "31"),
    ("H23", "160"),
    ("HSDS", "17"),
];

#[test]
fn valid_block_yields_one_record() {
    let bytes = block(MPPT);
    let mut accumulator = ChecksumAccumulator::new();
    accumulator.add_all(&bytes);
    assert!(accumulator.is_valid(), "device framing should sum to zero");

    let mut decoder = Decoder::new();
    let frames = decode(&mut decoder, &bytes);

    let checksum = *bytes.last().unwrap();
    assert_eq!(frames, [Frame::Text(expected(MPPT, checksum))]);
    assert_eq!(decoder.state(), State::Idle);
    assert_eq!(decoder.stats().records, 1);
}

#[test]
fn any_corrupted_byte_discards_the_block() {
    let original = block(MPPT);
    let checksum_label = original.len() - b"Checksum\t".len() - 1;

    for position in 0..original.len() {
        if DELIMITERS.contains(&original[position])
            || (checksum_label..original.len() - 1).contains(&position)
        {
            continue;
        }

        let mut corrupted = original.clone();
        corrupted[position] ^= 0x01;
        if DELIMITERS.contains(&corrupted[position]) {
            corrupted[position] ^= 0x03;
        }

        let mut decoder = Decoder::new();
        let frames = decode(&mut decoder, &corrupted);
        assert!(frames.is_empty(), "corruption at {position} should be discarded");
        assert_eq!(decoder.state(), State::Idle, "corruption at {position}");

        // The decoder is ready for the next block straight away.
        assert_eq!(decode(&mut decoder, &original).len(), 1);
    }
}

#[test]
fn noise_between_blocks_is_ignored() {
    let first = block(&[("V", "12800"), ("I", "100")]);
    let second = block(&[("V", "12900"), ("I", "-250")]);

    let mut stream = first.clone();
    stream.extend_from_slice(b"\r\n\x00\x01\x7f\xfe\r\n\r\n\x1b");
    stream.extend_from_slice(&second);

    let mut decoder = Decoder::new();
    let records: Vec<Record> = decode(&mut decoder, &stream)
        .into_iter()
        .filter_map(Frame::into_record)
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get_str("V"), Some("12800"));
    assert_eq!(records[1].get_str("I"), Some("-250"));
}

#[test]
fn truncated_block_is_replaced_by_the_next() {
    const FIELDS: &[(&str, &str)] = &[("PID", "0xA060"), ("V", "13650"), ("I", "-10")];

    // The first block loses everything after its battery voltage.
    let mut stream = b"\r\nPID\t0xA053\r\nV\t12800".to_vec();
    let next = block(FIELDS);
    stream.extend_from_slice(&next);

    let mut decoder = Decoder::new();
    let frames = decode(&mut decoder, &stream);

    assert_eq!(frames, [Frame::Text(expected(FIELDS, *next.last().unwrap()))]);
    assert_eq!(decoder.stats().interrupted, 1);
    assert_eq!(decoder.stats().discarded(), 1);
    assert_eq!(decoder.state(), State::Idle);
}

#[test]
fn truncated_block_is_replaced_under_first_label_coverage() {
    const FIELDS: &[(&str, &str)] = &[("PID", "0xA060"), ("V", "13650")];

    let mut next = b"PID\t0xA060\r\nV\t13650\r\nChecksum\t".to_vec();
    let checksum = checksum_for(&next);
    next.push(checksum);

    let mut stream = b"PID\t0xA053\r\nV\t12800\r\n".to_vec();
    stream.extend_from_slice(&next);

    let config = DecoderConfig::new().with_coverage(ChecksumCoverage::FirstLabel);
    let mut decoder = Decoder::with_config(config);
    assert_eq!(
        decode(&mut decoder, &stream),
        [Frame::Text(expected(FIELDS, checksum))]
    );
    assert_eq!(decoder.stats().interrupted, 1);
}

#[test]
fn without_a_start_label_truncation_costs_both_blocks() {
    let mut stream = b"\r\nPID\t0xA053\r\nV\t12800".to_vec();
    stream.extend(block(&[("PID", "0xA060"), ("V", "13650")]));

    let config = DecoderConfig::new().with_start_label(None);
    let mut decoder = Decoder::with_config(config);
    assert!(decode(&mut decoder, &stream).is_empty());
    assert_eq!(decoder.stats().interrupted, 0);
    assert_eq!(decoder.stats().checksum_mismatches, 1);
}

#[test]
fn leftover_checksum_field_is_not_a_record() {
    // A tail whose checksum happens to validate on its own.
    let mut tail = b"\r\nChecksum\t".to_vec();
    tail.push(checksum_for(&tail));

    let mut stream = b"\r\nV\t1\t".to_vec();
    stream.extend_from_slice(&tail);

    let mut decoder = Decoder::new();
    assert!(decode(&mut decoder, &stream).is_empty());
    assert_eq!(decoder.stats().records, 0);
    assert_eq!(decoder.stats().malformed, 2);
    assert_eq!(decoder.state(), State::Idle);
}

#[test]
fn text_and_hex_do_not_mix() {
    let mut stream = block(&[("V", "12800")]);
    stream.extend(hex(0x5, &[0x05, 0x41]));
    stream.extend(block(&[("V", "12810")]));

    let frames = decode(&mut Decoder::new(), &stream);

    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames[0].as_record().and_then(|record| record.get_str("V")),
        Some("12800")
    );
    assert_eq!(
        frames[1].as_hex().map(|frame| frame.response()),
        Some(Ok(Response::Ping { version: 0x4105 }))
    );
    assert_eq!(
        frames[2].as_record().and_then(|record| record.get_str("V")),
        Some("12810")
    );
}

#[test]
fn hex_inside_a_block_suspends_it() {
    let mut stream = Vec::new();
    let text = block(&[("V", "12800"), ("I", "100")]);
    // Split right after the first field's value.
    let split = text.windows(5).position(|w| w == b"12800").unwrap() + 5;
    stream.extend_from_slice(&text[..split]);
    stream.extend(hex(0xA, &[0xD5, 0xED, 0x00, 0x38, 0x05]));
    stream.extend_from_slice(&text[split..]);

    let frames = decode(&mut Decoder::new(), &stream);

    assert_eq!(frames.len(), 2, "HEX frame and the resumed block");
    let Some(Ok(Response::Async(register))) = frames[0].as_hex().map(|f| f.response()) else {
        panic!("expected an async register update, got {:?}", frames[0]);
    };
    assert_eq!(register.register, 0xEDD5);
    assert_eq!(register.value_u16(), Ok(0x0538));
    assert_eq!(
        frames[1].as_record().and_then(|record| record.get_str("I")),
        Some("100")
    );
}

#[test]
fn decoding_is_deterministic() {
    let mut stream = block(MPPT);
    stream.extend(hex(0x1, &[0x00]));
    stream.extend_from_slice(b"\x00garbage\r\n");
    stream.extend(block(&[("V", "1")]));
    stream.extend(hex(0x7, &[0x01, 0x02, 0x00, 0xFF]));

    let first = decode(&mut Decoder::new(), &stream);
    let second = decode(&mut Decoder::new(), &stream);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn pid_voltage_current_scenario() {
    const FIELDS: &[(&str, &str)] = &[("PID", "0xA060"), ("V", "13650"), ("I", "-10")];

    let mut bytes = b"PID\t0xA060\r\nV\t13650\r\nI\t-10\r\nChecksum\t".to_vec();
    let checksum = checksum_for(&bytes);
    bytes.push(checksum);
    bytes.extend_from_slice(b"\r\n");

    let config = DecoderConfig::new().with_coverage(ChecksumCoverage::FirstLabel);
    let mut decoder = Decoder::with_config(config);
    assert_eq!(
        decode(&mut decoder, &bytes),
        [Frame::Text(expected(FIELDS, checksum))]
    );
    assert_eq!(decoder.state(), State::Idle);

    // Flip each character of V's value, keeping the original checksum.
    let value = bytes.windows(5).position(|w| w == b"13650").unwrap();
    for position in value..value + 5 {
        let mut corrupted = bytes.clone();
        corrupted[position] = match corrupted[position] {
            b'9' => b'0',
            digit => digit + 1,
        };

        let mut decoder = Decoder::with_config(config);
        assert!(decode(&mut decoder, &corrupted).is_empty());
        assert_eq!(decoder.state(), State::Idle);
    }
}

#[test]
fn pid_voltage_current_scenario_with_device_framing() {
    const FIELDS: &[(&str, &str)] = &[("PID", "0xA060"), ("V", "13650"), ("I", "-10")];
    let bytes = block(FIELDS);

    let frames = decode(&mut Decoder::new(), &bytes);
    assert_eq!(frames, [Frame::Text(expected(FIELDS, *bytes.last().unwrap()))]);

    // The other coverage rule rejects the same bytes.
    let config = DecoderConfig::new().with_coverage(ChecksumCoverage::FirstLabel);
    let mut decoder = Decoder::with_config(config);
    assert!(decode(&mut decoder, &bytes).is_empty());
    assert_eq!(decoder.stats().checksum_mismatches, 1);
}

#[test]
fn empty_stream() {
    let mut decoder = Decoder::new();
    assert!(decode(&mut decoder, &[]).is_empty());
    assert_eq!(decoder.state(), State::Idle);
    assert_eq!(decoder.stats().records, 0);
    assert_eq!(decoder.stats().discarded(), 0);
}

#[test]
fn records_feed_a_snapshot() {
    let mut stream = block(MPPT);
    stream.extend(block(&[("V", "13700"), ("PPV", "garbage")]));

    let mut decoder = Decoder::new();
    let mut snapshot = Snapshot::new();
    for frame in decoder.frames(stream) {
        if let Frame::Text(record) = frame {
            snapshot.update(&record);
        }
    }

    assert_eq!(snapshot.records(), 2);
    assert_eq!(snapshot.battery_voltage(), Some(13.7));
    assert_eq!(snapshot.solar_power(), None);
    assert_eq!(snapshot.solar_voltage(), Some(18.02));
    assert_eq!(snapshot.yield_total(), Some(12.34));
    assert_eq!(snapshot.load_current(), Some(0.3));
    assert_eq!(snapshot.product_id(), Some(0xA053));
}
