use super::*;
use super::name::Name;

fn name(s: &str) -> Name {
    Name::new(s).unwrap()
}

#[test]
fn test_name_pack_unpack_with_compression() {
    let mut compression = Some(HashMap::new());
    let mut msg = vec![0u8; HEADER_LEN];
    msg = name("_device._udp.local.").pack(msg, &mut compression, 0).unwrap();
    let first_len = msg.len();
    msg = name("inst._device._udp.local.").pack(msg, &mut compression, 0).unwrap();

    // "inst" label plus a two byte pointer to the first name.
    assert_eq!(msg.len() - first_len, 1 + 4 + 2);

    let mut n = Name::default();
    let off = n.unpack(&msg, first_len).unwrap();
    assert_eq!(n.data, "inst._device._udp.local.");
    assert_eq!(off, msg.len());
}

#[test]
fn test_name_errors() {
    let mut none = None;
    assert_eq!(
        Name { data: "no-dot".to_owned() }.pack(vec![], &mut none, 0),
        Err(Error::ErrNonCanonicalName)
    );
    assert_eq!(
        Name { data: "a..b.".to_owned() }.pack(vec![], &mut none, 0),
        Err(Error::ErrZeroSegLen)
    );
    let long = format!("{}.", "x".repeat(64));
    assert_eq!(
        Name { data: long }.pack(vec![], &mut none, 0),
        Err(Error::ErrSegTooLong)
    );

    // Pointer loop.
    let msg = [0xC0, 0x00];
    assert_eq!(Name::default().unpack(&msg, 0), Err(Error::ErrTooManyPtr));
    // Reserved prefix.
    assert_eq!(Name::default().unpack(&[0x40], 0), Err(Error::ErrReserved));
    assert_eq!(Name::skip(&[3, b'a'], 0), Err(Error::ErrCalcLen));
}

#[test]
fn test_root_name() {
    let mut none = None;
    let msg = name(".").pack(vec![], &mut none, 0).unwrap();
    assert_eq!(msg, vec![0]);
    let mut n = Name::default();
    assert_eq!(n.unpack(&msg, 0), Ok(1));
    assert_eq!(n.data, ".");
}

#[test]
fn test_message_pack_unpack() {
    let mut m = Message {
        header: Header {
            id: 0x1234,
            response: true,
            authoritative: true,
            ..Default::default()
        },
        questions: vec![],
        answers: vec![
            Resource::new(
                name("_device._udp.local"),
                120,
                false,
                ResourceBody::Ptr(name("inst._device._udp.local")),
            ),
            Resource::new(
                name("inst._device._udp.local"),
                120,
                true,
                ResourceBody::Srv {
                    priority: 0,
                    weight: 0,
                    port: 4433,
                    target: name("inst.local"),
                },
            ),
            Resource::new(
                name("inst._device._udp.local"),
                120,
                true,
                ResourceBody::Txt(vec!["a=1".to_owned(), "b=".to_owned()]),
            ),
        ],
        authorities: vec![],
        additionals: vec![
            Resource::new(name("inst.local"), 120, true, ResourceBody::A([192, 168, 1, 10])),
            Resource::new(name("inst.local"), 120, true, ResourceBody::Aaaa([0xfe; 16])),
        ],
    };

    let packed = m.pack().unwrap();
    let parsed = Message::unpack(&packed).unwrap();

    assert_eq!(parsed.header, m.header);
    assert_eq!(parsed.answers.len(), 3);
    assert_eq!(parsed.additionals.len(), 2);
    for (got, want) in parsed.answers.iter().zip(&m.answers) {
        assert_eq!(got.body, want.body);
        assert_eq!(got.header.name.data, want.header.name.data);
        assert_eq!(got.cache_flush(), want.cache_flush());
    }
    assert_eq!(parsed.additionals[0].body, ResourceBody::A([192, 168, 1, 10]));
    assert_eq!(parsed.additionals[1].header.typ, DnsType::Aaaa);
}

#[test]
fn test_empty_txt_packs_one_empty_string() {
    let mut m = Message {
        answers: vec![Resource::new(name("x.local"), 1, false, ResourceBody::Txt(vec![]))],
        ..Default::default()
    };
    let packed = m.pack().unwrap();
    let parsed = Message::unpack(&packed).unwrap();
    assert_eq!(parsed.answers[0].header.length, 1);
    assert_eq!(parsed.answers[0].body, ResourceBody::Txt(vec![String::new()]));
}

#[test]
fn test_truncated_message() {
    let mut m = Message {
        questions: vec![Question {
            name: name("inst.local"),
            typ: DnsType::A,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    let packed = m.pack().unwrap();
    assert!(Message::unpack(&packed[..packed.len() - 1]).is_err());
    assert_eq!(Message::unpack(&packed[..5]), Err(Error::ErrBaseLen));
}

#[test]
fn test_question_unicast_bit() {
    let q = Question {
        name: name("inst.local"),
        typ: DnsType::A,
        class: DnsClass(DNSCLASS_INET.0 | 0x8000),
    };
    assert!(q.unicast_response());
    assert_eq!(q.class.base(), DNSCLASS_INET);
}
