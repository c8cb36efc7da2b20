use super::*;
use crate::message::DNSCLASS_INET;
use crate::message::question::Question;

fn query(id: u16, name: &str, typ: DnsType) -> Vec<u8> {
    let mut m = Message {
        header: Header {
            id,
            ..Default::default()
        },
        questions: vec![Question {
            name: Name::new(name).unwrap(),
            typ,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    m.pack().unwrap()
}

fn published() -> MdnsServer {
    let mut server = MdnsServer::new(ResponderConfig::default());
    let subtypes: BTreeSet<String> = ["heatpump".to_owned()].into_iter().collect();
    let txt: BTreeMap<String, String> = [
        ("deviceid".to_owned(), "de-1".to_owned()),
        ("productid".to_owned(), "pr-1".to_owned()),
    ]
    .into_iter()
    .collect();
    server.update_info("dev1", &subtypes, &txt);
    server
}

fn local_ips() -> Vec<IpAddress> {
    vec![
        IpAddress::V4([192, 168, 1, 10]),
        IpAddress::V6([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
        IpAddress::V4([10, 0, 0, 1]),
    ]
}

#[test]
fn test_unpublished_server_ignores_queries() {
    let server = MdnsServer::new(ResponderConfig::default());
    assert_eq!(
        server.handle_packet(&query(7, "_device._udp.local", DnsType::Ptr)),
        None
    );
    assert_eq!(
        server.build_packet(0, false, false, &local_ips(), 4433),
        Err(Error::ErrNotPublished)
    );
}

#[test]
fn test_handle_packet_authoritative_names() {
    let server = published();
    let cases = [
        ("_services._dns-sd._udp.local", DnsType::Ptr),
        ("_device._udp.local", DnsType::Ptr),
        ("heatpump._sub._device._udp.local", DnsType::Ptr),
        ("dev1._device._udp.local", DnsType::Srv),
        ("dev1._device._udp.local", DnsType::Txt),
        ("dev1.local", DnsType::A),
        ("DEV1.LOCAL", DnsType::Aaaa),
        ("dev1.local", DnsType::All),
    ];
    for (i, (name, typ)) in cases.iter().enumerate() {
        let id = 100 + i as u16;
        assert_eq!(
            server.handle_packet(&query(id, name, *typ)),
            Some(id),
            "{name} {typ}"
        );
    }
}

#[test]
fn test_handle_packet_rejects() {
    let server = published();
    assert_eq!(server.handle_packet(&query(1, "other.local", DnsType::A)), None);
    assert_eq!(
        server.handle_packet(&query(1, "_other._udp.local", DnsType::Ptr)),
        None
    );
    assert_eq!(
        server.handle_packet(&query(1, "dev1.local", DnsType::Nsec)),
        None
    );
    assert_eq!(server.handle_packet(&[1, 2, 3]), None);
    assert_eq!(server.handle_packet(&[]), None);

    // Responses from other responders are not queries.
    let response = server.build_packet(9, false, false, &local_ips(), 4433).unwrap();
    assert_eq!(server.handle_packet(&response), None);
}

#[test]
fn test_build_packet_records() {
    let server = published();
    let packet = server.build_packet(42, false, false, &local_ips(), 4433).unwrap();
    let m = Message::unpack(&packet).unwrap();

    assert_eq!(m.header.id, 42);
    assert!(m.header.response);
    assert!(m.header.authoritative);
    assert!(m.questions.is_empty());

    // services PTR, type PTR, subtype PTR, SRV, TXT
    assert_eq!(m.answers.len(), 5);
    assert_eq!(m.answers[0].header.name.data, "_services._dns-sd._udp.local.");
    assert_eq!(
        m.answers[0].body,
        ResourceBody::Ptr(Name::new("_device._udp.local").unwrap())
    );
    assert_eq!(
        m.answers[1].body,
        ResourceBody::Ptr(Name::new("dev1._device._udp.local").unwrap())
    );
    assert_eq!(
        m.answers[2].header.name.data,
        "heatpump._sub._device._udp.local."
    );
    assert_eq!(
        m.answers[3].body,
        ResourceBody::Srv {
            priority: 0,
            weight: 0,
            port: 4433,
            target: Name::new("dev1.local").unwrap(),
        }
    );
    assert_eq!(
        m.answers[4].body,
        ResourceBody::Txt(vec!["deviceid=de-1".to_owned(), "productid=pr-1".to_owned()])
    );

    for (i, r) in m.answers.iter().enumerate() {
        assert_eq!(r.header.ttl, 120);
        // Only the instance's SRV and TXT records are unique.
        assert_eq!(r.cache_flush(), i >= 3, "{r}");
    }

    // Bounded by max_local_ips.
    assert_eq!(m.additionals.len(), 2);
    assert_eq!(m.additionals[0].body, ResourceBody::A([192, 168, 1, 10]));
    assert_eq!(m.additionals[1].header.typ, DnsType::Aaaa);
    assert!(m.additionals.iter().all(|r| r.header.name.data == "dev1.local."));
}

#[test]
fn test_build_packet_unicast_and_goodbye() {
    let server = published();

    let unicast = Message::unpack(&server.build_packet(1, true, false, &local_ips(), 4433).unwrap()).unwrap();
    assert!(unicast.answers.iter().all(|r| !r.cache_flush()));
    assert!(unicast.additionals.iter().all(|r| !r.cache_flush()));

    let goodbye = Message::unpack(&server.build_packet(0, false, true, &local_ips(), 4433).unwrap()).unwrap();
    assert!(goodbye.answers.iter().all(|r| r.header.ttl == 0));
    assert!(goodbye.additionals.iter().all(|r| r.header.ttl == 0));
}

#[test]
fn test_build_packet_too_big() {
    let mut server = MdnsServer::new(ResponderConfig::default().with_buffer_size(64));
    server.update_info("dev1", &BTreeSet::new(), &BTreeMap::new());
    assert_eq!(
        server.build_packet(0, false, false, &local_ips(), 4433),
        Err(Error::ErrPacketTooBig)
    );
}

#[test]
fn test_update_info_replaces_instance() {
    let mut server = published();
    server.update_info("dev2", &BTreeSet::new(), &BTreeMap::new());
    assert_eq!(server.handle_packet(&query(3, "dev1.local", DnsType::A)), None);
    assert_eq!(server.handle_packet(&query(3, "dev2.local", DnsType::A)), Some(3));
    assert_eq!(server.info().map(|i| i.instance_name.as_str()), Some("dev2"));
}
