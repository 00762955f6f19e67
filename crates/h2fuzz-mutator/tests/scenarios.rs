use h2fuzz_frame::hpack::{HeaderField, IndexingType, PrefixType};
use h2fuzz_frame::{
    DataFrame, Frame, HeadersFrame, Setting, SettingsFrame, Stream, END_HEADERS, END_STREAM,
    HEADER_SIZE,
};
use h2fuzz_mutator::{
    FieldGroup, FieldRep, FrameField, MutableFields, MutationConfig, Mutator, Outcome,
    SequenceRng, SkipReason,
};

fn request() -> Stream {
    Stream::from_frames(vec![
        HeadersFrame::new(
            1,
            vec![
                HeaderField::indexed(":method", "GET"),
                HeaderField::indexed(":scheme", "http"),
            ],
        ),
        DataFrame::new(1, b"hello".to_vec()),
    ])
    .unwrap()
}

fn encodings(frame: &Frame) -> Vec<(PrefixType, IndexingType)> {
    frame
        .header_list()
        .unwrap()
        .fields
        .iter()
        .map(|h| (h.prefix, h.indexing))
        .collect()
}

#[test]
fn delete_first_frame() {
    let mut stream = request();
    let headers_size = stream.frames()[0].wire_size();
    let before = stream.size();

    let mut mutator = Mutator::new(MutationConfig::default());
    // frame 0, operator draw 40 selects delete
    let outcome = mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![0, 40]), 512)
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(stream.frames(), &[DataFrame::new(1, b"hello".to_vec())]);
    assert_eq!(stream.size(), before - headers_size);
    assert_eq!(stream.encode().unwrap().len(), stream.size());
}

#[test]
fn split_settings_frame() {
    let mut stream = Stream::from_frames(vec![SettingsFrame::new(vec![
        Setting::new(1, 4096),
        Setting::new(2, 0),
        Setting::new(3, 100),
        Setting::new(5, 16384),
    ])])
    .unwrap();
    let before = stream.size();

    let mut config = MutationConfig::default();
    config.mutable_fields = MutableFields::empty();
    config.mutable_fields.settings = vec![FieldRep(FrameField::Split, FieldGroup::Settings)];
    let mut mutator = Mutator::new(config);

    // frame 0, bit operator, field 0, setting 1, split after 1 + 1
    let outcome = mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![0, 80, 0, 1, 1]), 512)
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);

    let frames = stream.frames();
    assert_eq!(frames.len(), 2);
    let mut ids = Vec::new();
    for frame in frames {
        let Frame::Settings(settings) = frame else {
            panic!("expected SETTINGS, got {}", frame.kind());
        };
        assert_eq!(settings.head.length, 12);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 12);
        ids.extend(settings.settings.iter().map(|s| s.id));
    }
    assert_eq!(ids, vec![1, 2, 3, 5]);
    assert_eq!(stream.size(), before + HEADER_SIZE);
}

#[test]
fn header_delete_reinserts_dependency() {
    let mut stream = Stream::from_frames(vec![HeadersFrame::new(
        1,
        vec![
            HeaderField::literal("name", "value", PrefixType::LiteralWithIndexing),
            HeaderField::new("name", "other", PrefixType::LiteralWithoutIndexing, IndexingType::Name),
            HeaderField::indexed("name", "value"),
        ],
    )])
    .unwrap();

    let mut mutator = Mutator::new(MutationConfig::default());
    let outcome = mutator
        .mutate_field(
            &mut stream,
            0,
            FieldRep(FrameField::Delete, FieldGroup::Header),
            &mut SequenceRng::new(vec![0]),
            512,
        )
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        encodings(&stream.frames()[0]),
        vec![
            (PrefixType::LiteralWithIndexing, IndexingType::None),
            (PrefixType::LiteralWithIndexing, IndexingType::Name),
        ]
    );

    let bytes = stream.encode().unwrap();
    assert_eq!(bytes.len(), stream.size());
    let decoded = Stream::decode(&bytes).unwrap();
    let values: Vec<&[u8]> = decoded.frames()[0]
        .header_list()
        .unwrap()
        .fields
        .iter()
        .map(|h| h.value.as_slice())
        .collect();
    assert_eq!(values, vec![b"other".as_slice(), b"value".as_slice()]);
}

#[test]
fn frame_delete_reinserts_dependency() {
    let mut stream = Stream::from_frames(vec![
        HeadersFrame::new(
            1,
            vec![HeaderField::literal("a", "1", PrefixType::LiteralWithIndexing)],
        ),
        HeadersFrame::new(
            3,
            vec![
                HeaderField::indexed("a", "1"),
                HeaderField::new("a", "2", PrefixType::LiteralWithoutIndexing, IndexingType::Name),
            ],
        ),
    ])
    .unwrap();

    let mut mutator = Mutator::new(MutationConfig::default());
    let outcome = mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![0, 40]), 512)
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(stream.len(), 1);
    assert_eq!(
        encodings(&stream.frames()[0]),
        vec![
            (PrefixType::LiteralWithIndexing, IndexingType::None),
            (PrefixType::LiteralWithoutIndexing, IndexingType::Name),
        ]
    );
    let bytes = stream.encode().unwrap();
    assert_eq!(bytes.len(), stream.size());
    assert!(Stream::decode(&bytes).is_ok());
}

#[test]
fn fix_normalizes_flags() {
    let mut stream = request();
    stream.push(HeadersFrame::new(1, vec![HeaderField::indexed(":path", "/")]));
    for frame in stream.frames_mut() {
        frame.head_mut().set_flag(END_STREAM, true);
    }

    let mut mutator = Mutator::new(MutationConfig::default());
    // any frame, operator draw 60 selects fix
    mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![0, 60]), 512)
        .unwrap();
    let once = stream.clone();
    mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![1, 60]), 512)
        .unwrap();
    assert_eq!(stream, once);

    let flags: Vec<(bool, bool)> = stream
        .frames()
        .iter()
        .map(|f| (f.head().has_flag(END_STREAM), f.head().has_flag(END_HEADERS)))
        .collect();
    assert_eq!(flags, vec![(false, false), (false, false), (true, true)]);
}

#[test]
fn rejected_mutation_leaves_stream_untouched() {
    let mut stream = request();
    let before = stream.clone();
    let max = stream.size();
    let mut mutator = Mutator::new(MutationConfig::default());
    // dup of the DATA frame with no room to spare
    let outcome = mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![1, 20]), max)
        .unwrap();
    assert_eq!(outcome, Outcome::Skipped(SkipReason::BudgetExceeded));
    assert_eq!(stream, before);
}

#[test]
fn swap_across_table_reset_is_repaired() {
    let mut stream = Stream::from_frames(vec![
        HeadersFrame::new(
            1,
            vec![HeaderField::literal("a", "1", PrefixType::LiteralWithIndexing)],
        ),
        HeadersFrame::new(3, vec![HeaderField::indexed("a", "1")]),
        HeadersFrame::new(
            5,
            vec![HeaderField::literal("b", "2", PrefixType::LiteralWithoutIndexing)],
        ),
    ])
    .unwrap();
    if let Some(list) = stream.get_mut(2).and_then(|f| f.header_list_mut()) {
        list.size_updates = vec![0];
    }
    stream.refresh_header_blocks().unwrap();

    let mut mutator = Mutator::new(MutationConfig::default());
    // frame 1, operator draw 0 selects swap, partner frame 2
    let outcome = mutator
        .mutate(&mut stream, &mut SequenceRng::new(vec![1, 0, 2]), 4096)
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        encodings(&stream.frames()[2]),
        vec![(PrefixType::LiteralWithIndexing, IndexingType::None)]
    );
    let bytes = stream.encode().unwrap();
    assert_eq!(bytes.len(), stream.size());
    let decoded = Stream::decode(&bytes).unwrap();
    assert_eq!(decoded.frames()[1].header_list().unwrap().size_updates, vec![0]);
}

#[test]
fn buffers_are_reproducible_per_seed() {
    let input = request().encode().unwrap();
    let donor = Stream::from_frames(vec![SettingsFrame::new(vec![Setting::new(3, 7)])])
        .unwrap()
        .encode()
        .unwrap();
    let mut mutator = Mutator::new(MutationConfig::default());
    for seed in [0u64, 1, 42, 9000] {
        assert_eq!(
            mutator.mutate_buffer(&input, seed, 256).unwrap(),
            mutator.mutate_buffer(&input, seed, 256).unwrap()
        );
        assert_eq!(
            mutator.crossover_buffers(&input, &donor, seed, 256).unwrap(),
            mutator.crossover_buffers(&input, &donor, seed, 256).unwrap()
        );
    }
}

#[test]
fn malformed_input_is_an_error() {
    let mut mutator = Mutator::new(MutationConfig::default());
    assert!(mutator.mutate_buffer(&[0, 0, 5, 0], 1, 256).is_err());
}
