//! Property-based tests: round trips and byte-order symmetry over generated format strings,
//! and validator/cursor agreement over arbitrary input.

use proptest::prelude::*;
use structpack::{validate, Descriptor, Format, FormatCursor};

#[derive(Debug, Clone)]
enum Elem {
    Scalar(u8),
    Repeat(usize, u8),
    Array(usize, u8),
    Text(usize, u8),
    Pad(usize),
    Group(usize, Vec<Elem>),
}

fn render(elems: &[Elem], out: &mut String) {
    for e in elems {
        match e {
            Elem::Scalar(t) => out.push(*t as char),
            Elem::Repeat(n, t) | Elem::Text(n, t) => out.push_str(&format!("{}{}", n, *t as char)),
            Elem::Array(n, t) => out.push_str(&format!("[{}]{}", n, *t as char)),
            Elem::Pad(n) => out.push_str(&format!("{}x", n)),
            Elem::Group(n, inner) => {
                out.push_str(&format!("{}(", n));
                render(inner, out);
                out.push(')');
            }
        }
        out.push(' ');
    }
}

fn leaf() -> impl Strategy<Value = Elem> {
    let int = prop::sample::select(&b"bBhHiIqQ"[..]);
    let text = prop::sample::select(&b"suw"[..]);
    prop_oneof![
        int.clone().prop_map(Elem::Scalar),
        (1..4usize, int.clone()).prop_map(|(n, t)| Elem::Repeat(n, t)),
        (1..5usize, int).prop_map(|(n, t)| Elem::Array(n, t)),
        (1..6usize, text).prop_map(|(n, t)| Elem::Text(n, t)),
        (1..4usize).prop_map(Elem::Pad),
    ]
}

fn elem() -> impl Strategy<Value = Elem> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        (1..4usize, prop::collection::vec(inner, 1..4)).prop_map(|(n, v)| Elem::Group(n, v))
    })
}

fn format_string(elems: &[Elem], marker: char) -> String {
    let mut s = String::new();
    s.push(marker);
    render(elems, &mut s);
    s
}

fn fields_of(format: &Format<'_>) -> Vec<Descriptor> {
    format
        .descriptors()
        .filter_map(Result::ok)
        .filter(|d| !d.is_padding())
        .collect()
}

proptest! {
    #[test]
    fn prop_pack_unpack_round_trip(
        elems in prop::collection::vec(elem(), 1..6),
        seed in prop::collection::vec(any::<u8>(), 64),
        big in any::<bool>(),
    ) {
        let fmt = format_string(&elems, if big { '>' } else { '<' });
        let format = Format::new(&fmt).expect("generated format is valid");
        let descs = fields_of(&format);
        prop_assume!(!descs.is_empty());
        let size = format.packed_size();

        let values: Vec<Vec<u8>> = descs
            .iter()
            .enumerate()
            .map(|(i, d)| (0..d.byte_len()).map(|k| seed[(i * 7 + k) % seed.len()]).collect())
            .collect();
        let inputs: Vec<&[u8]> = values.iter().map(Vec::as_slice).collect();
        let mut buf = vec![0u8; size];
        prop_assert_eq!(format.pack_ptr(descs.len(), &inputs, &mut buf), Ok(size));

        let mut outs: Vec<Vec<u8>> = descs.iter().map(|d| vec![0xa5; d.field_len(true)]).collect();
        let mut regions: Vec<&mut [u8]> = outs.iter_mut().map(Vec::as_mut_slice).collect();
        prop_assert_eq!(format.unpack_ptr(descs.len(), &mut regions, &buf), Ok(size));

        for ((d, v), o) in descs.iter().zip(&values).zip(&outs) {
            prop_assert_eq!(&o[..d.byte_len()], v.as_slice());
            if d.field_type.is_text() {
                prop_assert!(o[d.byte_len()..].iter().all(|&b| b == 0));
            }
        }

        let decoded: Vec<&[u8]> = outs.iter().map(Vec::as_slice).collect();
        let mut again = vec![0u8; size];
        prop_assert_eq!(format.pack_ptr(descs.len(), &decoded, &mut again), Ok(size));
        prop_assert_eq!(again, buf);
    }

    #[test]
    fn prop_byte_orders_mirror(
        elems in prop::collection::vec(elem(), 1..6),
        seed in prop::collection::vec(any::<u8>(), 64),
    ) {
        let be_fmt = format_string(&elems, '>');
        let le_fmt = format_string(&elems, '<');
        let be = Format::new(&be_fmt).expect("valid");
        let le = Format::new(&le_fmt).expect("valid");
        let descs = fields_of(&be);
        prop_assume!(!descs.is_empty());

        let values: Vec<Vec<u8>> = descs
            .iter()
            .enumerate()
            .map(|(i, d)| (0..d.byte_len()).map(|k| seed[(i + k * 3) % seed.len()]).collect())
            .collect();
        let inputs: Vec<&[u8]> = values.iter().map(Vec::as_slice).collect();
        let mut be_buf = vec![0u8; be.packed_size()];
        let mut le_buf = vec![0u8; le.packed_size()];
        be.pack_ptr(descs.len(), &inputs, &mut be_buf).expect("pack be");
        le.pack_ptr(descs.len(), &inputs, &mut le_buf).expect("pack le");

        let mut pos = 0;
        for d in be.descriptors() {
            let d = d.expect("descriptor");
            let w = d.field_type.width();
            for _ in 0..d.count() {
                let mut element = be_buf[pos..pos + w].to_vec();
                if !d.is_padding() {
                    element.reverse();
                }
                prop_assert_eq!(&le_buf[pos..pos + w], element.as_slice());
                pos += w;
            }
        }
        prop_assert_eq!(pos, be_buf.len());
    }

    #[test]
    fn prop_validated_strings_iterate_cleanly(s in "[<>xbBhHiIqQsuw0-9()\\[\\] \t]{0,16}") {
        match validate(&s) {
            Ok(()) => {
                let cursor = FormatCursor::new(&s).expect("non-empty");
                for d in cursor.take(1000) {
                    prop_assert!(d.is_ok(), "{:?}: {:?}", s, d);
                }
            }
            Err(e) => prop_assert_eq!(Format::new(&s).map(|_| ()), Err(e)),
        }
    }
}
