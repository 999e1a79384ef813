// Contact bookkeeping: per-body doubly linked lists of contact edges

use slotmap::SlotMap;

use super::body::{BodyHandle, RigidBody};
use super::world::BroadphaseHooks;

slotmap::new_key_type! {
    /// Handle to identify contacts
    pub struct ContactKey;

    /// Handle to identify one body's side of a contact
    pub struct EdgeKey;
}

/// A potential or active collision between two fixtures
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub fixture_a: String,
    pub body_b: BodyHandle,
    pub fixture_b: String,
    /// Fixtures are actually overlapping (set by the narrowphase)
    pub touching: bool,
    /// Cleared to skip this contact for the current step
    pub enabled: bool,
    edge_a: EdgeKey,
    edge_b: EdgeKey,
}

/// One body's link to a contact
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEdge {
    /// Body owning this edge
    pub body: BodyHandle,
    /// Body on the other side of the contact
    pub other: BodyHandle,
    pub contact: ContactKey,
    prev: Option<EdgeKey>,
    next: Option<EdgeKey>,
}

/// Arena of contacts and their edges.
///
/// The list head for each body lives on the body itself; operations that
/// relink lists take the body arena alongside.
#[derive(Debug, Default)]
pub struct ContactGraph {
    contacts: SlotMap<ContactKey, Contact>,
    edges: SlotMap<EdgeKey, ContactEdge>,
}

impl ContactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contact between two bodies, pushing an edge onto each list.
    /// Returns `None` if either body is missing or they are the same body.
    pub fn create_contact(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, RigidBody>,
        body_a: BodyHandle,
        fixture_a: &str,
        body_b: BodyHandle,
        fixture_b: &str,
    ) -> Option<ContactKey> {
        if body_a == body_b || !bodies.contains_key(body_a) || !bodies.contains_key(body_b) {
            return None;
        }

        // Edge keys are patched in once both edges exist.
        let key = self.contacts.insert(Contact {
            body_a,
            fixture_a: fixture_a.to_string(),
            body_b,
            fixture_b: fixture_b.to_string(),
            touching: false,
            enabled: true,
            edge_a: EdgeKey::default(),
            edge_b: EdgeKey::default(),
        });

        let edge_a = self.push_edge(bodies, body_a, body_b, key);
        let edge_b = self.push_edge(bodies, body_b, body_a, key);

        if let Some(contact) = self.contacts.get_mut(key) {
            contact.edge_a = edge_a;
            contact.edge_b = edge_b;
        }

        Some(key)
    }

    fn push_edge(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, RigidBody>,
        body: BodyHandle,
        other: BodyHandle,
        contact: ContactKey,
    ) -> EdgeKey {
        let head = bodies.get(body).and_then(RigidBody::contact_edges);

        let edge = self.edges.insert(ContactEdge {
            body,
            other,
            contact,
            prev: None,
            next: head,
        });

        if let Some(old_head) = head.and_then(|h| self.edges.get_mut(h)) {
            old_head.prev = Some(edge);
        }
        if let Some(body) = bodies.get_mut(body) {
            body.contact_edges = Some(edge);
        }

        edge
    }

    fn unlink_edge(&mut self, bodies: &mut SlotMap<BodyHandle, RigidBody>, key: EdgeKey) {
        let Some(edge) = self.edges.remove(key) else {
            return;
        };

        if let Some(prev) = edge.prev.and_then(|p| self.edges.get_mut(p)) {
            prev.next = edge.next;
        }
        if let Some(next) = edge.next.and_then(|n| self.edges.get_mut(n)) {
            next.prev = edge.prev;
        }

        if let Some(body) = bodies.get_mut(edge.body) {
            if body.contact_edges == Some(key) {
                body.contact_edges = edge.next;
            }
        }
    }

    /// Remove a contact and unlink it from both bodies
    pub fn destroy_contact(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, RigidBody>,
        key: ContactKey,
    ) -> Option<Contact> {
        let contact = self.contacts.remove(key)?;
        self.unlink_edge(bodies, contact.edge_a);
        self.unlink_edge(bodies, contact.edge_b);
        Some(contact)
    }

    /// Tear down every contact of `body`.
    ///
    /// Walks the list once, lets the contact manager release each contact,
    /// then clears the head. Returns the number of contacts destroyed.
    pub fn destroy_contacts(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, RigidBody>,
        body: BodyHandle,
        hooks: &mut dyn BroadphaseHooks,
    ) -> usize {
        let head = bodies.get(body).and_then(RigidBody::contact_edges);
        let keys: Vec<ContactKey> = self.edges(head).map(|edge| edge.contact).collect();

        for key in &keys {
            if let Some(contact) = self.contacts.get(*key) {
                hooks.destroy_contact(*key, contact);
            }
            self.destroy_contact(bodies, *key);
        }

        if let Some(body) = bodies.get_mut(body) {
            body.contact_edges = None;
        }

        keys.len()
    }

    pub fn contact(&self, key: ContactKey) -> Option<&Contact> {
        self.contacts.get(key)
    }

    pub fn contact_mut(&mut self, key: ContactKey) -> Option<&mut Contact> {
        self.contacts.get_mut(key)
    }

    /// Walk a body's edge list starting at `head`
    pub fn edges(&self, head: Option<EdgeKey>) -> EdgeIter<'_> {
        EdgeIter {
            edges: &self.edges,
            next: head,
        }
    }

    /// Contacts touching `body`, most recent first
    pub fn contacts_of<'a>(&'a self, body: &RigidBody) -> impl Iterator<Item = &'a Contact> + 'a {
        self.edges(body.contact_edges())
            .filter_map(move |edge| self.contacts.get(edge.contact))
    }

    /// Linear walk; not cached
    pub fn contact_count(&self, body: &RigidBody) -> usize {
        self.edges(body.contact_edges()).count()
    }

    /// Total number of live contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

impl Contact {
    /// The body on the other side from `body`, if `body` is part of this contact
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if body == self.body_a {
            Some(self.body_b)
        } else if body == self.body_b {
            Some(self.body_a)
        } else {
            None
        }
    }
}

/// Iterator over a body's contact edges
pub struct EdgeIter<'a> {
    edges: &'a SlotMap<EdgeKey, ContactEdge>,
    next: Option<EdgeKey>,
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = &'a ContactEdge;

    fn next(&mut self) -> Option<Self::Item> {
        let edge = self.edges.get(self.next?)?;
        self.next = edge.next;
        Some(edge)
    }
}
