//! Headless physics world
//!
//! Approximates every polygon by its circumcircle and every wall by an
//! axis-aligned box. Good enough to drive the merge loop without a real
//! engine; contact numerics are deliberately simple.

use std::collections::BTreeMap;

use glam::Vec2;

use super::physics::{
    BodyDesc, BodyKind, BodyState, BodyTag, Collider, ContactHandler, PhysicsWorld,
};

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Normal pointing from the first body toward the second
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two circles
pub fn circle_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = b_pos - a_pos;
    let dist = delta.length();
    let reach = a_radius + b_radius;

    if dist >= reach {
        return CollisionResult::miss();
    }

    // Coincident centers: pick an arbitrary but stable axis
    let normal = if dist > 1e-4 { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        normal,
        penetration: reach - dist,
    }
}

/// Check overlap between an axis-aligned box and a circle.
/// The normal points from the box toward the circle.
pub fn box_circle_collision(
    box_pos: Vec2,
    half_extents: Vec2,
    circle_pos: Vec2,
    radius: f32,
) -> CollisionResult {
    let local = circle_pos - box_pos;
    let closest = local.clamp(-half_extents, half_extents);
    let delta = local - closest;
    let dist = delta.length();

    if dist > 1e-4 {
        if dist >= radius {
            return CollisionResult::miss();
        }
        return CollisionResult {
            hit: true,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center inside the box: push out along the shallowest axis
    let depth = half_extents - local.abs();
    let normal = if depth.x < depth.y {
        Vec2::new(local.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, local.y.signum())
    };
    CollisionResult {
        hit: true,
        normal,
        penetration: depth.x.min(depth.y) + radius,
    }
}

#[derive(Debug, Clone)]
struct Body {
    tag: BodyTag,
    kind: BodyKind,
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    half_extents: Vec2,
    restitution: f32,
    inv_mass: f32,
}

impl Body {
    fn from_desc(tag: BodyTag, desc: BodyDesc) -> Self {
        let (radius, half_extents) = match desc.collider {
            Collider::Polygon { radius, .. } => (radius, Vec2::ZERO),
            Collider::Box { half_extents } => (0.0, half_extents),
        };
        let inv_mass = match desc.kind {
            BodyKind::Dynamic if desc.mass > 0.0 => 1.0 / desc.mass,
            _ => 0.0,
        };
        Self {
            tag,
            kind: desc.kind,
            pos: desc.position,
            vel: desc.velocity,
            radius,
            half_extents,
            restitution: desc.restitution,
            inv_mass,
        }
    }

    fn is_box(&self) -> bool {
        self.half_extents != Vec2::ZERO
    }
}

/// Minimal circle-based physics world
#[derive(Debug, Clone)]
pub struct CirclePhysics {
    bodies: Vec<Body>,
    gravity: Vec2,
    /// Pairs touching after the last step, with the handler's verdict
    touching: BTreeMap<(BodyTag, BodyTag), bool>,
}

impl CirclePhysics {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            bodies: Vec::new(),
            gravity,
            touching: BTreeMap::new(),
        }
    }

    fn index_of(&self, tag: BodyTag) -> Option<usize> {
        self.bodies.iter().position(|b| b.tag == tag)
    }

    fn pair_key(a: BodyTag, b: BodyTag) -> (BodyTag, BodyTag) {
        if a <= b { (a, b) } else { (b, a) }
    }

    fn collide(a: &Body, b: &Body) -> CollisionResult {
        match (a.is_box(), b.is_box()) {
            (false, false) => circle_circle_collision(a.pos, a.radius, b.pos, b.radius),
            (true, false) => box_circle_collision(a.pos, a.half_extents, b.pos, b.radius),
            (false, true) => {
                let mut result = box_circle_collision(b.pos, b.half_extents, a.pos, a.radius);
                result.normal = -result.normal;
                result
            }
            (true, true) => CollisionResult::miss(),
        }
    }

    /// Push the pair apart and exchange the normal impulse
    fn respond(a: &mut Body, b: &mut Body, contact: &CollisionResult) {
        let inv_sum = a.inv_mass + b.inv_mass;
        if inv_sum <= 0.0 {
            return;
        }

        let correction = contact.normal * (contact.penetration / inv_sum);
        a.pos -= correction * a.inv_mass;
        b.pos += correction * b.inv_mass;

        let closing = (b.vel - a.vel).dot(contact.normal);
        if closing < 0.0 {
            let restitution = a.restitution.min(b.restitution);
            let impulse = -(1.0 + restitution) * closing / inv_sum;
            a.vel -= contact.normal * impulse * a.inv_mass;
            b.vel += contact.normal * impulse * b.inv_mass;
        }
    }
}

fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    debug_assert!(i < j);
    let (head, tail) = bodies.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

impl PhysicsWorld for CirclePhysics {
    fn add_body(&mut self, tag: BodyTag, desc: BodyDesc) {
        if let Some(i) = self.index_of(tag) {
            log::warn!("Replacing existing body {:?}", tag);
            self.bodies.remove(i);
        }
        self.bodies.push(Body::from_desc(tag, desc));
    }

    fn remove_body(&mut self, tag: BodyTag) -> bool {
        let Some(i) = self.index_of(tag) else {
            return false;
        };
        self.bodies.remove(i);
        self.touching.retain(|&(a, b), _| a != tag && b != tag);
        true
    }

    fn body_state(&self, tag: BodyTag) -> Option<BodyState> {
        self.index_of(tag).map(|i| BodyState {
            pos: self.bodies[i].pos,
            vel: self.bodies[i].vel,
        })
    }

    fn set_velocity(&mut self, tag: BodyTag, vel: Vec2) {
        if let Some(i) = self.index_of(tag) {
            self.bodies[i].vel = vel;
        }
    }

    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn step(&mut self, dt: f32, on_contact: &mut ContactHandler<'_>) {
        for body in self.bodies.iter_mut() {
            if body.kind == BodyKind::Dynamic {
                body.vel += self.gravity * dt;
                body.pos += body.vel * dt;
            }
        }

        let mut touching = BTreeMap::new();
        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = pair_mut(&mut self.bodies, i, j);
                if a.kind == BodyKind::Fixed && b.kind == BodyKind::Fixed {
                    continue;
                }

                let contact = Self::collide(a, b);
                if !contact.hit {
                    continue;
                }

                let key = Self::pair_key(a.tag, b.tag);
                // Contact begin fires once per pair until they separate
                let respond = match self.touching.get(&key) {
                    Some(&verdict) => verdict,
                    None => on_contact(a.tag, b.tag),
                };
                touching.insert(key, respond);

                if respond {
                    Self::respond(a, b, &contact);
                }
            }
        }
        self.touching = touching;
    }
}
