#[cfg(test)]
mod server_test;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use shared::IpAddress;
use shared::error::{Error, Result};

use crate::config::{ResponderConfig, SERVICES_DNS_SD};
use crate::message::header::Header;
use crate::message::name::Name;
use crate::message::resource::{Resource, ResourceBody};
use crate::message::{DnsType, Message};

/// The published service: what the responder announces and answers for.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub instance_name: String,
    pub subtypes: BTreeSet<String>,
    pub txt_items: BTreeMap<String, String>,
}

/// Responder state for a single DNS-SD service.
///
/// `MdnsServer` does no I/O. The owner feeds it received packets through
/// [`handle_packet`](MdnsServer::handle_packet) and, when that yields a query
/// id, asks [`build_packet`](MdnsServer::build_packet) for the response to
/// send.
pub struct MdnsServer {
    config: ResponderConfig,
    info: Option<ServiceInfo>,
}

impl MdnsServer {
    pub fn new(config: ResponderConfig) -> Self {
        Self { config, info: None }
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    pub fn info(&self) -> Option<&ServiceInfo> {
        self.info.as_ref()
    }

    /// Replaces the published instance. Later responses describe the new one.
    pub fn update_info(
        &mut self,
        instance_name: &str,
        subtypes: &BTreeSet<String>,
        txt_items: &BTreeMap<String, String>,
    ) {
        debug!("publishing instance {instance_name}");
        self.info = Some(ServiceInfo {
            instance_name: instance_name.to_owned(),
            subtypes: subtypes.clone(),
            txt_items: txt_items.clone(),
        });
    }

    /// Decides whether `packet` is a query this responder answers.
    ///
    /// Returns the query id for a standard query that asks about the
    /// service enumeration name, the service type or one of its subtypes,
    /// the instance or the instance's host name. Anything else, malformed
    /// packets included, yields `None`.
    pub fn handle_packet(&self, packet: &[u8]) -> Option<u16> {
        let info = self.info.as_ref()?;

        let (header, questions) = match Message::unpack_questions(packet) {
            Ok(parsed) => parsed,
            Err(err) => {
                trace!("dropping unparsable packet: {err}");
                return None;
            }
        };
        if header.response || header.op_code != 0 {
            return None;
        }

        let names = match self.authoritative_names(info) {
            Ok(names) => names,
            Err(err) => {
                debug!("published names are invalid: {err}");
                return None;
            }
        };
        let answered = questions.iter().any(|q| {
            matches!(
                q.typ,
                DnsType::Ptr | DnsType::Srv | DnsType::Txt | DnsType::A | DnsType::Aaaa | DnsType::All
            ) && names.iter().any(|n| n.eq_ignore_case(&q.name))
        });
        if answered {
            trace!("answering query {}", header.id);
            Some(header.id)
        } else {
            None
        }
    }

    /// Builds the response for query `id` (0 for announcements).
    ///
    /// Unique records carry the cache-flush bit unless the response is sent
    /// unicast. A goodbye response has every TTL set to zero.
    pub fn build_packet(
        &self,
        id: u16,
        unicast_response: bool,
        goodbye: bool,
        local_ips: &[IpAddress],
        port: u16,
    ) -> Result<Vec<u8>> {
        let info = self.info.as_ref().ok_or(Error::ErrNotPublished)?;
        let ttl = if goodbye { 0 } else { self.config.ttl };
        let flush = !unicast_response;

        let service = self.service_name()?;
        let instance = self.instance_name(info)?;
        let host = Self::host_name(info)?;

        let mut answers = vec![
            Resource::new(
                Name::new(SERVICES_DNS_SD)?,
                ttl,
                false,
                ResourceBody::Ptr(service.clone()),
            ),
            Resource::new(service.clone(), ttl, false, ResourceBody::Ptr(instance.clone())),
        ];
        for subtype in &info.subtypes {
            answers.push(Resource::new(
                Name::new(&format!("{subtype}._sub.{}", service.data))?,
                ttl,
                false,
                ResourceBody::Ptr(instance.clone()),
            ));
        }
        answers.push(Resource::new(
            instance.clone(),
            ttl,
            flush,
            ResourceBody::Srv {
                priority: 0,
                weight: 0,
                port,
                target: host.clone(),
            },
        ));
        answers.push(Resource::new(
            instance,
            ttl,
            flush,
            ResourceBody::Txt(
                info.txt_items
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect(),
            ),
        ));

        let additionals = local_ips
            .iter()
            .take(self.config.max_local_ips)
            .map(|ip| {
                let body = match ip {
                    IpAddress::V4(a) => ResourceBody::A(*a),
                    IpAddress::V6(a) => ResourceBody::Aaaa(*a),
                };
                Resource::new(host.clone(), ttl, flush, body)
            })
            .collect();

        let mut msg = Message {
            header: Header {
                id,
                response: true,
                authoritative: true,
                ..Default::default()
            },
            questions: vec![],
            answers,
            authorities: vec![],
            additionals,
        };
        let packet = msg.pack()?;
        if packet.len() > self.config.buffer_size {
            return Err(Error::ErrPacketTooBig);
        }
        Ok(packet)
    }

    fn service_name(&self) -> Result<Name> {
        Name::new(&self.config.service_type)
    }

    fn instance_name(&self, info: &ServiceInfo) -> Result<Name> {
        Name::new(&format!(
            "{}.{}",
            info.instance_name,
            self.config.service_type.trim_end_matches('.')
        ))
    }

    fn host_name(info: &ServiceInfo) -> Result<Name> {
        Name::new(&format!("{}.local", info.instance_name))
    }

    fn authoritative_names(&self, info: &ServiceInfo) -> Result<Vec<Name>> {
        let service = self.service_name()?;
        let mut names = vec![
            Name::new(SERVICES_DNS_SD)?,
            self.instance_name(info)?,
            Self::host_name(info)?,
        ];
        for subtype in &info.subtypes {
            names.push(Name::new(&format!("{subtype}._sub.{}", service.data))?);
        }
        names.push(service);
        Ok(names)
    }
}
