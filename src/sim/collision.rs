//! Contact detection between a moving circle and its obstacles
//!
//! A mover is always a circle. Obstructions are segments. Another actor is a
//! circle while it is moving, but once it has stood still for a frame it
//! becomes the one face of its bounding square that faces the mover, which
//! lets movers slip past the corners of idle actors.

use glam::DVec2;

use super::actor::ActorId;
use super::geometry::closest_point_on_segment;

/// The geometry a contact was made against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactShape {
    Line { a: DVec2, b: DVec2 },
    Circle { center: DVec2, radius: f64 },
}

impl ContactShape {
    /// Distance from `p` to the shape's surface, and the unit direction that
    /// moves `p` away from it
    pub fn separation(&self, p: DVec2) -> (f64, DVec2) {
        match *self {
            ContactShape::Line { a, b } => {
                let closest = closest_point_on_segment(p, a, b);
                (p.distance(closest), outward(p - closest))
            }
            ContactShape::Circle { center, radius } => {
                (p.distance(center) - radius, outward(p - center))
            }
        }
    }
}

/// One violated constraint found during a slide iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub shape: ContactShape,
    /// The actor behind this contact, if it is not a static obstruction
    pub actor: Option<ActorId>,
    /// Distance from the projected position to the surface
    pub distance: f64,
    /// Resolution precedence; smaller is handled first
    pub order: f64,
}

/// Snapshot of another actor's collision body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: ActorId,
    pub position: DVec2,
    pub radius: f64,
    pub stationary: bool,
}

/// Direction of `diff` as a unit vector; a zero offset points along +x
#[inline]
fn outward(diff: DVec2) -> DVec2 {
    DVec2::from_angle(diff.y.atan2(diff.x))
}

/// Contact between a mover of `radius` projected to `projected` and the
/// segment `a`-`b`. `origin` is where the mover currently stands.
pub fn line_contact(
    origin: DVec2,
    projected: DVec2,
    radius: f64,
    a: DVec2,
    b: DVec2,
) -> Option<Contact> {
    let closest = closest_point_on_segment(projected, a, b);
    let distance = projected.distance(closest);
    (distance < radius).then(|| Contact {
        shape: ContactShape::Line { a, b },
        actor: None,
        distance,
        order: origin.distance(closest),
    })
}

/// The face of a square of half-size `half` centred on `center` that looks
/// toward `offset` (mover position minus square centre)
pub fn square_face(center: DVec2, half: f64, offset: DVec2) -> (DVec2, DVec2) {
    let (l, r) = (center.x - half, center.x + half);
    let (t, b) = (center.y - half, center.y + half);
    if offset.x.abs() > offset.y.abs() {
        if offset.x < 0.0 {
            (DVec2::new(l, t), DVec2::new(l, b))
        } else {
            (DVec2::new(r, t), DVec2::new(r, b))
        }
    } else if offset.y < 0.0 {
        (DVec2::new(l, t), DVec2::new(r, t))
    } else {
        (DVec2::new(l, b), DVec2::new(r, b))
    }
}

/// Contact between a mover and another actor's body
pub fn body_contact(
    body: &Body,
    origin: DVec2,
    projected: DVec2,
    radius: f64,
) -> Option<Contact> {
    if body.stationary {
        let (a, b) = square_face(body.position, body.radius, origin - body.position);
        line_contact(origin, projected, radius, a, b).map(|c| Contact {
            actor: Some(body.id),
            ..c
        })
    } else {
        let d = projected.distance(body.position);
        (d < radius + body.radius).then(|| Contact {
            shape: ContactShape::Circle {
                center: body.position,
                radius: body.radius,
            },
            actor: Some(body.id),
            distance: d - body.radius,
            order: d - body.radius,
        })
    }
}

/// Share of a push that actually moves the pushed actor, in [0, 1].
///
/// Infinite weight yields 0. A weightless actor is always fully pushable,
/// even by a pusher with no strength.
pub fn push_factor(weight: f64, strength: f64) -> f64 {
    if weight == 0.0 {
        return 1.0;
    }
    let ratio = weight / strength;
    if ratio.is_nan() {
        return 0.0;
    }
    1.0 - ratio.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> ActorId {
        ActorId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn test_line_contact_inside_radius() {
        let a = DVec2::new(0.0, 10.0);
        let b = DVec2::new(20.0, 10.0);
        let c = line_contact(DVec2::new(5.0, 0.0), DVec2::new(5.0, 4.0), 8.0, a, b);
        let c = c.expect("contact");
        assert_eq!(c.distance, 6.0);
        assert_eq!(c.order, 10.0);
        assert!(c.actor.is_none());

        assert!(line_contact(DVec2::ZERO, DVec2::new(5.0, 1.0), 8.0, a, b).is_none());
    }

    #[test]
    fn test_separation_points_away() {
        let line = ContactShape::Line {
            a: DVec2::new(0.0, 10.0),
            b: DVec2::new(20.0, 10.0),
        };
        let (d, dir) = line.separation(DVec2::new(5.0, 4.0));
        assert_eq!(d, 6.0);
        assert!((dir - DVec2::new(0.0, -1.0)).length() < 1e-12);

        let circle = ContactShape::Circle {
            center: DVec2::new(10.0, 0.0),
            radius: 8.0,
        };
        let (d, dir) = circle.separation(DVec2::new(0.0, 0.0));
        assert_eq!(d, 2.0);
        assert!((dir - DVec2::new(-1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_square_face_by_dominant_axis() {
        let c = DVec2::new(10.0, 10.0);
        assert_eq!(
            square_face(c, 8.0, DVec2::new(-20.0, 3.0)),
            (DVec2::new(2.0, 2.0), DVec2::new(2.0, 18.0))
        );
        assert_eq!(
            square_face(c, 8.0, DVec2::new(20.0, -3.0)),
            (DVec2::new(18.0, 2.0), DVec2::new(18.0, 18.0))
        );
        assert_eq!(
            square_face(c, 8.0, DVec2::new(3.0, -20.0)),
            (DVec2::new(2.0, 2.0), DVec2::new(18.0, 2.0))
        );
        // Exact diagonal falls to the vertical faces
        assert_eq!(
            square_face(c, 8.0, DVec2::new(5.0, 5.0)),
            (DVec2::new(2.0, 18.0), DVec2::new(18.0, 18.0))
        );
    }

    #[test]
    fn test_body_contact_stationary_is_square() {
        let body = Body {
            id: id(1),
            position: DVec2::new(20.0, 0.0),
            radius: 8.0,
            stationary: true,
        };
        let origin = DVec2::new(0.0, 0.0);
        let projected = DVec2::new(6.0, 7.0);
        let c = body_contact(&body, origin, projected, 8.0).expect("square face contact");
        assert!(matches!(c.shape, ContactShape::Line { .. }));
        assert_eq!(c.actor, Some(id(1)));
        assert_eq!(c.distance, 6.0);
    }

    #[test]
    fn test_body_contact_moving_is_circle() {
        let body = Body {
            id: id(2),
            position: DVec2::new(20.0, 0.0),
            radius: 8.0,
            stationary: false,
        };
        let c = body_contact(&body, DVec2::ZERO, DVec2::new(6.0, 0.0), 8.0).expect("circle");
        assert_eq!(c.distance, 6.0);
        assert_eq!(c.order, 6.0);
        assert!(body_contact(&body, DVec2::ZERO, DVec2::new(3.0, 0.0), 8.0).is_none());
    }

    #[test]
    fn test_push_factor_extremes() {
        assert_eq!(push_factor(f64::INFINITY, 10.0), 0.0);
        assert_eq!(push_factor(f64::INFINITY, f64::INFINITY), 0.0);
        assert_eq!(push_factor(0.0, 0.0), 1.0);
        assert_eq!(push_factor(0.0, 5.0), 1.0);
        assert_eq!(push_factor(5.0, 0.0), 0.0);
        assert_eq!(push_factor(5.0, 10.0), 0.5);
        assert_eq!(push_factor(20.0, 10.0), 0.0);
    }
}
