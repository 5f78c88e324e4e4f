use crate::field::ScalarField;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    VelocityX,
    VelocityY,
}

// Border cells are never simulated directly; they are re-derived from the
// adjacent interior cell. A velocity component normal to a wall mirrors with
// flipped sign, everything else copies. Corners average their two
// orthogonally-adjacent border cells.
pub fn apply_boundary(kind: FieldKind, field: &mut ScalarField) {
    let n = field.side();
    let flip_x = kind == FieldKind::VelocityX;
    let flip_y = kind == FieldKind::VelocityY;
    for j in 1..n - 1 {
        let low = field.get(1, j);
        let high = field.get(n - 2, j);
        field.set(0, j, if flip_x { -low } else { low });
        field.set(n - 1, j, if flip_x { -high } else { high });
    }
    for i in 1..n - 1 {
        let low = field.get(i, 1);
        let high = field.get(i, n - 2);
        field.set(i, 0, if flip_y { -low } else { low });
        field.set(i, n - 1, if flip_y { -high } else { high });
    }
    field.set(0, 0, 0.5 * (field.get(1, 0) + field.get(0, 1)));
    field.set(0, n - 1, 0.5 * (field.get(1, n - 1) + field.get(0, n - 2)));
    field.set(n - 1, 0, 0.5 * (field.get(n - 2, 0) + field.get(n - 1, 1)));
    field.set(
        n - 1,
        n - 1,
        0.5 * (field.get(n - 2, n - 1) + field.get(n - 1, n - 2)),
    );
}
