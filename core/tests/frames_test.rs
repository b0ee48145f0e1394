use atsc_core::fieldbus::frames::{
    DecodedFrame, DeviceAddress, FRAME_VERSION, FrameType, InputStateFrame, OutputStateFrame,
};

// ==========================================================================
// Output state packing
// ==========================================================================

#[test]
fn test_output_frame_header() {
    let frame = OutputStateFrame::new(DeviceAddress::Tfib1, vec![false; 6], true);
    let content = frame.content();
    assert_eq!(content[0], 0x08);
    assert_eq!(content[1], FRAME_VERSION);
    assert_eq!(content[2], FrameType::Outputs as u8);
    assert_eq!(content[3], 0x80); // transfer relay asserted
    assert_eq!(content.len(), 4 + 1);
}

#[test]
fn test_output_frame_bit_positions() {
    // Outputs pack into bits 64, 32, 16, 4, 2, 1; bits 128 and 8 stay
    // clear.
    let mut states = vec![false; 6];
    states[0] = true;
    let frame = OutputStateFrame::new(DeviceAddress::Tfib1, states, false);
    assert_eq!(frame.content()[4], 64);

    let frame = OutputStateFrame::new(DeviceAddress::Tfib1, vec![true; 6], false);
    let byte = frame.content()[4];
    assert_eq!(byte, 64 + 32 + 16 + 4 + 2 + 1);
    assert_eq!(byte & 0x88, 0);
}

#[test]
fn test_output_frame_payload_width() {
    // 96 channels pack six per byte after the special-output header.
    let frame = OutputStateFrame::new(DeviceAddress::Tfib1, vec![false; 96], false);
    assert_eq!(frame.content().len(), 3 + 1 + 16);
}

#[test]
fn test_output_vector_round_trip() {
    // decode(encode(v)) == v for an arbitrary pattern.
    let states: Vec<bool> = (0..96).map(|i| i % 3 == 0 || i % 7 == 0).collect();
    let frame = OutputStateFrame::new(DeviceAddress::Tfib1, states.clone(), true);
    let content = frame.content();
    let payload = &content[3..];
    assert!(OutputStateFrame::unpack_transfer(payload));
    assert_eq!(OutputStateFrame::unpack(payload, 96), states);
}

// ==========================================================================
// Input state frames
// ==========================================================================

#[test]
fn test_input_frame_slot_numbering() {
    // Slot 1 is bit 0 of byte 0.
    let frame = InputStateFrame::new(DeviceAddress::Controller, vec![0b0000_0101, 0b0000_0001]);
    assert!(frame.slot(1));
    assert!(!frame.slot(2));
    assert!(frame.slot(3));
    assert!(frame.slot(9));
    assert!(!frame.slot(10));
    assert!(!frame.slot(64)); // out of range reads inactive
}

#[test]
fn test_input_frame_content_round_trip() {
    let frame = InputStateFrame::new(DeviceAddress::Controller, vec![0xA5, 0x0F]);
    let content = frame.content();
    let decoded = DecodedFrame::parse(&content);
    assert_eq!(decoded.address, DeviceAddress::Controller);
    assert_eq!(decoded.version, FRAME_VERSION);
    assert_eq!(decoded.frame_type, FrameType::Inputs);
    assert_eq!(decoded.payload, vec![0xA5, 0x0F]);
}

// ==========================================================================
// Header decoding
// ==========================================================================

#[test]
fn test_unknown_codes_decode_to_unknown() {
    assert_eq!(FrameType::from(99), FrameType::Unknown);
    assert_eq!(DeviceAddress::from(0x42), DeviceAddress::Unknown);

    let decoded = DecodedFrame::parse(&[0x42, 7, 99, 1, 2]);
    assert_eq!(decoded.address, DeviceAddress::Unknown);
    assert_eq!(decoded.frame_type, FrameType::Unknown);
    assert_eq!(decoded.payload, vec![1, 2]);
}

#[test]
fn test_short_content_parses_as_unknown() {
    let decoded = DecodedFrame::parse(&[0xFF]);
    assert_eq!(decoded.address, DeviceAddress::Controller);
    assert_eq!(decoded.frame_type, FrameType::Unknown);
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_frame_type_codes() {
    assert_eq!(FrameType::Awk as u8, 1);
    assert_eq!(FrameType::Nak as u8, 2);
    assert_eq!(FrameType::Ign as u8, 3);
    assert_eq!(FrameType::Beacon as u8, 4);
    assert_eq!(FrameType::Outputs as u8, 16);
    assert_eq!(FrameType::Inputs as u8, 32);
}
