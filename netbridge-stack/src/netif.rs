use std::collections::BTreeSet;

use crate::addr::{IpAddrT, IpAddrType};
use crate::error::{Err, Result};
use crate::netcore::Core;

/// Index of a network interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetifId(pub u8);

/// A network interface: its addresses and multicast memberships.
#[derive(Debug, Clone)]
pub struct Netif {
    pub name: String,
    pub ip4: Option<IpAddrT>,
    pub ip6: Option<IpAddrT>,
    pub(crate) igmp_groups: BTreeSet<IpAddrT>,
    pub(crate) mld_groups: BTreeSet<IpAddrT>,
    pub(crate) fail_joins: bool,
}

impl Netif {
    pub fn owns(&self, addr: &IpAddrT) -> bool {
        self.ip4.as_ref() == Some(addr) || self.ip6.as_ref() == Some(addr)
    }

    pub fn addr_of(&self, ty: IpAddrType) -> Option<IpAddrT> {
        match ty {
            IpAddrType::V4 => self.ip4,
            IpAddrType::V6 => self.ip6,
            IpAddrType::Any => self.ip4.or(self.ip6),
        }
    }

    pub fn has_joined(&self, group: &IpAddrT) -> bool {
        self.igmp_groups.contains(group) || self.mld_groups.contains(group)
    }
}

impl Core {
    /// Adds an interface. The first interface added becomes the default.
    pub fn netif_add(&mut self, name: &str, ip4: Option<IpAddrT>, ip6: Option<IpAddrT>) -> NetifId {
        let id = NetifId(self.next_netif);
        self.next_netif = self.next_netif.wrapping_add(1);
        self.netifs.insert(
            id,
            Netif {
                name: name.to_owned(),
                ip4,
                ip6,
                igmp_groups: BTreeSet::new(),
                mld_groups: BTreeSet::new(),
                fail_joins: false,
            },
        );
        if self.default_netif.is_none() {
            self.default_netif = Some(id);
        }
        log::debug!("netif {name} added as {id:?}");
        id
    }

    pub fn netif_remove(&mut self, id: NetifId) -> bool {
        let removed = self.netifs.remove(&id).is_some();
        if self.default_netif == Some(id) {
            self.default_netif = None;
        }
        removed
    }

    pub fn netif_set_default(&mut self, id: NetifId) -> Result<()> {
        if !self.netifs.contains_key(&id) {
            return Err(Err::Arg);
        }
        self.default_netif = Some(id);
        Ok(())
    }

    pub fn netif_default(&self) -> Option<NetifId> {
        self.default_netif
    }

    pub fn netif(&self, id: NetifId) -> Option<&Netif> {
        self.netifs.get(&id)
    }

    pub fn netif_list(&self) -> Vec<NetifId> {
        self.netifs.keys().copied().collect()
    }

    pub fn netif_ip4_addr(&self, id: NetifId) -> Option<IpAddrT> {
        self.netifs.get(&id).and_then(|n| n.ip4)
    }

    pub fn netif_ip6_addr(&self, id: NetifId) -> Option<IpAddrT> {
        self.netifs.get(&id).and_then(|n| n.ip6)
    }

    /// Makes every subsequent group join on `id` fail with `Err::If`.
    pub fn netif_set_join_failure(&mut self, id: NetifId, fail: bool) {
        if let Some(netif) = self.netifs.get_mut(&id) {
            netif.fail_joins = fail;
        }
    }

    /// The netif the datagram being dispatched arrived on. Only set while
    /// an input callback runs.
    pub fn ip_current_input_netif(&self) -> Option<NetifId> {
        self.current_input
    }

    /// The netif owning `addr`; loopback addresses belong to the default.
    pub(crate) fn netif_for_addr(&self, addr: &IpAddrT) -> Option<NetifId> {
        if addr.is_loopback() {
            return self.default_netif;
        }
        self.netifs
            .iter()
            .find(|(_, n)| n.owns(addr))
            .map(|(id, _)| *id)
    }

    pub fn igmp_joingroup_netif(&mut self, id: NetifId, group: &IpAddrT) -> Result<()> {
        if !matches!(group, IpAddrT::V4(_)) || !group.is_multicast() {
            return Err(Err::Val);
        }
        let netif = self.netifs.get_mut(&id).ok_or(Err::Val)?;
        if netif.fail_joins {
            return Err(Err::If);
        }
        netif.igmp_groups.insert(*group);
        Ok(())
    }

    pub fn igmp_leavegroup_netif(&mut self, id: NetifId, group: &IpAddrT) -> Result<()> {
        let netif = self.netifs.get_mut(&id).ok_or(Err::Val)?;
        if netif.igmp_groups.remove(group) {
            Ok(())
        } else {
            Err(Err::Val)
        }
    }

    pub fn mld6_joingroup_netif(&mut self, id: NetifId, group: &IpAddrT) -> Result<()> {
        if !matches!(group, IpAddrT::V6(_)) || !group.is_multicast() {
            return Err(Err::Val);
        }
        let netif = self.netifs.get_mut(&id).ok_or(Err::Val)?;
        if netif.fail_joins {
            return Err(Err::If);
        }
        netif.mld_groups.insert(*group);
        Ok(())
    }

    pub fn mld6_leavegroup_netif(&mut self, id: NetifId, group: &IpAddrT) -> Result<()> {
        let netif = self.netifs.get_mut(&id).ok_or(Err::Val)?;
        if netif.mld_groups.remove(group) {
            Ok(())
        } else {
            Err(Err::Val)
        }
    }
}
