//! Encoder-Tests: Bit-Muster, Lernverhalten, Fehlerpfade.

use std::rc::Rc;

use crate::decoder::decode;
use crate::encoder::{encode, Encoder, EncoderConfig};
use crate::event::{AtContent, ChContent, ExiEvent, NsContent};
use crate::options::{Alignment, ExiOptions, Preserve};
use crate::qname::QName;
use crate::Error;

fn qn(local: &str) -> Rc<QName> {
    Rc::new(QName::new("", local))
}

fn se(local: &str) -> ExiEvent {
    ExiEvent::StartElement(qn(local))
}

fn at(local: &str, value: &str) -> ExiEvent {
    ExiEvent::Attribute(AtContent {
        qname: qn(local),
        value: value.into(),
    })
}

fn ch(value: &str) -> ExiEvent {
    ExiEvent::Characters(ChContent {
        value: value.into(),
    })
}

fn doc(inner: Vec<ExiEvent>) -> Vec<ExiEvent> {
    let mut events = vec![ExiEvent::StartDocument];
    events.extend(inner);
    events.push(ExiEvent::EndDocument);
    events
}

// --- Test 1: Exakte Bytes für das triviale Element ---

/// `<a/>`: Header 0x80, SE(*) 0 Bits, URI-Hit "" (01), LocalName-Miss
/// "a" (Länge+1 = 2, 'a'), EE (00), ED 0 Bits.
#[test]
fn trivial_element_exact_bytes() {
    let events = doc(vec![se("a"), ExiEvent::EndElement]);
    let bytes = encode(&events, &ExiOptions::default()).unwrap();
    assert_eq!(bytes, vec![0x80, 0x40, 0x98, 0x40]);
}

/// Cookie-Emission stellt `$EXI` voran.
#[test]
fn cookie_emission() {
    let events = doc(vec![se("a"), ExiEvent::EndElement]);
    let config = EncoderConfig {
        include_cookie: true,
        include_options: None,
    };
    let mut enc = Encoder::new(ExiOptions::default(), config).unwrap();
    for e in &events {
        enc.encode_event(e).unwrap();
    }
    let bytes = enc.finish().unwrap();
    assert_eq!(&bytes[0..4], b"$EXI");
    assert_eq!(&bytes[4..], &[0x80, 0x40, 0x98, 0x40]);
}

// --- Test 2: Options-Emission ---

/// Default-Optionen: kein Options-Dokument im Header (Presence-Bit 0).
#[test]
fn no_options_for_defaults() {
    let events = doc(vec![se("a"), ExiEvent::EndElement]);
    let bytes = encode(&events, &ExiOptions::default()).unwrap();
    assert_eq!(bytes[0] & 0b0010_0000, 0);
}

/// Nicht-Default-Optionen setzen das Presence-Bit automatisch.
#[test]
fn auto_options_for_non_defaults() {
    let opts = ExiOptions {
        fragment: true,
        ..Default::default()
    };
    let events = doc(vec![se("a"), ExiEvent::EndElement]);
    let bytes = encode(&events, &opts).unwrap();
    assert_eq!(bytes[0] & 0b0010_0000, 0b0010_0000);

    // Und der Decoder liest sie aus dem Header zurück
    let (_, decoded_opts) = decode(&bytes).unwrap();
    assert!(decoded_opts.fragment);
}

// --- Test 3: Grammar-Lernen verkürzt Wiederholungen ---

/// Zweites Geschwister-Element mit gleichem Namen nutzt den gelernten
/// 1-Teil-Code statt SE(*) + QName.
#[test]
fn learned_sibling_is_shorter() {
    let events = doc(vec![
        se("r"),
        se("item"),
        ExiEvent::EndElement,
        se("item"),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
    ]);
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    let mut positions = Vec::new();
    for e in &events {
        enc.encode_event(e).unwrap();
        positions.push(enc.bit_position());
    }
    // Span von SE(item) #1 (Event-Index 2) vs. SE(item) #2 (Index 4)
    let first = positions[2] - positions[1];
    let second = positions[4] - positions[3];
    assert!(
        second < first,
        "learned SE should be shorter: {second} >= {first}"
    );

    let bytes = enc.finish().unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

/// Fragment mit zwei `<x y="1"/>`; das zweite
/// Element ist strikt kleiner (gelernte SE/AT, Value-Hit).
#[test]
fn fragment_attribute_reuse_shrinks() {
    let opts = ExiOptions {
        fragment: true,
        ..Default::default()
    };
    let element = vec![se("x"), at("y", "1"), ExiEvent::EndElement];
    let mut events = vec![ExiEvent::StartDocument];
    events.extend(element.clone());
    events.extend(element);
    events.push(ExiEvent::EndDocument);

    let mut enc = Encoder::new(opts, EncoderConfig::default()).unwrap();
    let mut positions = Vec::new();
    for e in &events {
        enc.encode_event(e).unwrap();
        positions.push(enc.bit_position());
    }
    // Events 1..=3 = erstes Element, 4..=6 = zweites
    let first = positions[3] - positions[0];
    let second = positions[6] - positions[3];
    assert!(
        second < first,
        "second element should shrink: {second} >= {first}"
    );

    let bytes = enc.finish().unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

// --- Test 4: Byte-aligned Streams ---

#[test]
fn byte_aligned_round_trip() {
    let opts = ExiOptions {
        alignment: Alignment::ByteAlignment,
        ..Default::default()
    };
    let events = doc(vec![
        se("r"),
        at("id", "42"),
        ch("body text"),
        se("nested"),
        ch("x"),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
    ]);
    let bytes = encode(&events, &opts).unwrap();
    let (decoded, decoded_opts) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
    assert_eq!(decoded_opts.alignment, Alignment::ByteAlignment);
}

// --- Test 5: Value-Partitionen über den Draht ---

/// Spec 7.3.3: Capacity 4, fünf Werte; der verdrängte Wert läuft
/// wieder als Miss, ein gehaltener als Hit.
#[test]
fn value_capacity_wrap_round_trip() {
    let opts = ExiOptions {
        value_partition_capacity: Some(4),
        ..Default::default()
    };
    let mut inner = vec![se("r")];
    for v in ["v1", "v2", "v3", "v4", "v5"] {
        inner.push(se("e"));
        inner.push(at("a", v));
        inner.push(ExiEvent::EndElement);
    }
    // v2 sitzt noch an seinem modularen Slot (Hit); v1 wurde verdrängt
    // und läuft erneut als Miss (verdrängt dabei seinerseits den ältesten)
    for v in ["v2", "v1"] {
        inner.push(se("e"));
        inner.push(at("a", v));
        inner.push(ExiEvent::EndElement);
    }
    inner.push(ExiEvent::EndElement);
    let events = doc(inner);

    let bytes = encode(&events, &opts).unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

/// `valueMaxLength`: überlange Werte werden nie zu Hits.
#[test]
fn value_max_length_round_trip() {
    let opts = ExiOptions {
        value_max_length: Some(4),
        ..Default::default()
    };
    let long = "longer-than-four";
    let events = doc(vec![
        se("r"),
        at("a", long),
        se("e"),
        at("a", long),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
    ]);
    let bytes = encode(&events, &opts).unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

/// Capacity 0 deaktiviert die Value-Tabellen; alles läuft als Literal.
#[test]
fn value_capacity_zero_round_trip() {
    let opts = ExiOptions {
        value_partition_capacity: Some(0),
        ..Default::default()
    };
    let events = doc(vec![
        se("r"),
        at("a", "same"),
        se("e"),
        at("a", "same"),
        ExiEvent::EndElement,
        ExiEvent::EndElement,
    ]);
    let bytes = encode(&events, &opts).unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

// --- Test 6: Fehlerpfade (InconsistentProcState) ---

#[test]
fn at_after_content_rejected() {
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    enc.encode_event(&ExiEvent::StartDocument).unwrap();
    enc.encode_event(&se("a")).unwrap();
    enc.encode_event(&ch("text")).unwrap();
    let err = enc.encode_event(&at("x", "1")).unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}

#[test]
fn first_event_must_be_sd() {
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    let err = enc.encode_event(&se("a")).unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}

#[test]
fn second_root_element_rejected() {
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    enc.encode_event(&ExiEvent::StartDocument).unwrap();
    enc.encode_event(&se("a")).unwrap();
    enc.encode_event(&ExiEvent::EndElement).unwrap();
    let err = enc.encode_event(&se("b")).unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}

#[test]
fn finish_requires_ed() {
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    enc.encode_event(&ExiEvent::StartDocument).unwrap();
    enc.encode_event(&se("a")).unwrap();
    let err = enc.finish().unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}

#[test]
fn events_after_ed_rejected() {
    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    for e in doc(vec![se("a"), ExiEvent::EndElement]) {
        enc.encode_event(&e).unwrap();
    }
    let err = enc.encode_event(&se("b")).unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}

/// CM ohne Preserve.comments wird verworfen statt encodiert.
#[test]
fn unpreserved_events_are_dropped() {
    let events = doc(vec![
        se("a"),
        ExiEvent::Comment(crate::event::CmContent { text: "c".into() }),
        ExiEvent::EndElement,
    ]);
    let bytes = encode(&events, &ExiOptions::default()).unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert!(!decoded.iter().any(|e| matches!(e, ExiEvent::Comment(_))));
}

/// Ungültige Options-Kombination scheitert beim Konstruktor.
#[test]
fn invalid_options_rejected_up_front() {
    let opts = ExiOptions {
        strict: true,
        preserve: Preserve {
            comments: true,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        Encoder::new(opts, EncoderConfig::default()).unwrap_err(),
        Error::HeaderOptionsMismatch(_)
    ));
}

/// Self-Contained ist erkannt, aber nicht implementiert.
#[test]
fn self_contained_not_implemented() {
    let opts = ExiOptions {
        self_contained: true,
        ..Default::default()
    };
    let mut enc = Encoder::new(opts, EncoderConfig::default()).unwrap();
    enc.encode_event(&ExiEvent::StartDocument).unwrap();
    enc.encode_event(&se("a")).unwrap();
    assert!(matches!(
        enc.encode_event(&ExiEvent::SelfContained).unwrap_err(),
        Error::NotImplemented(_)
    ));
}

/// (Pre-)Compression-Bodies sind erkannt, aber nicht implementiert.
#[test]
fn compression_body_not_implemented() {
    for opts in [
        ExiOptions {
            compression: true,
            ..Default::default()
        },
        ExiOptions {
            alignment: Alignment::PreCompression,
            ..Default::default()
        },
    ] {
        assert!(matches!(
            Encoder::new(opts, EncoderConfig::default()).unwrap_err(),
            Error::NotImplemented(_)
        ));
    }
}

// --- Test 7: Streaming-Drain ---

#[test]
fn drain_to_matches_batch_output() {
    let events = doc(vec![
        se("r"),
        at("a", "v"),
        ch("text"),
        ExiEvent::EndElement,
    ]);

    let expected = encode(&events, &ExiOptions::default()).unwrap();

    let mut enc = Encoder::new(ExiOptions::default(), EncoderConfig::default()).unwrap();
    let mut streamed = Vec::new();
    for e in &events {
        enc.encode_event(e).unwrap();
        enc.drain_to(&mut streamed).unwrap();
    }
    enc.finish_to(&mut streamed).unwrap();
    assert_eq!(streamed, expected);
}

// --- Test 8: NS-Events (Preserve.prefixes) ---

#[test]
fn ns_before_se_is_encoded_after_se_on_wire() {
    let opts = ExiOptions {
        preserve: Preserve {
            prefixes: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let events = doc(vec![
        ExiEvent::NamespaceDeclaration(NsContent {
            uri: "urn:x".into(),
            prefix: "p".into(),
            local_element_ns: true,
        }),
        ExiEvent::StartElement(Rc::new(QName::with_prefix("urn:x", "a", "p"))),
        ExiEvent::EndElement,
    ]);
    let bytes = encode(&events, &opts).unwrap();
    let (decoded, _) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);
}

/// NS ohne folgendes SE ist ein Zustandsfehler.
#[test]
fn dangling_ns_rejected() {
    let opts = ExiOptions {
        preserve: Preserve {
            prefixes: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut enc = Encoder::new(opts, EncoderConfig::default()).unwrap();
    enc.encode_event(&ExiEvent::StartDocument).unwrap();
    enc.encode_event(&se("a")).unwrap();
    enc.encode_event(&ExiEvent::NamespaceDeclaration(NsContent {
        uri: "urn:x".into(),
        prefix: "p".into(),
        local_element_ns: false,
    }))
    .unwrap();
    let err = enc.encode_event(&ExiEvent::EndElement).unwrap_err();
    assert!(matches!(err, Error::InconsistentProcState { .. }), "{err:?}");
}
