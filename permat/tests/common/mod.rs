//! Shared helpers for the integration tests: building filtration records
//! from simplicial complexes with correct alternating-sign boundaries,
//! cross-species reduction, and decomposition audits.

#![allow(dead_code)]

use rustc_hash::{FxHashMap, FxHashSet};

use permat::columns::{Column, VectorColumn};
use permat::diagram::IndexPair;
use permat::fields::{Invertible, NonZeroCoefficient};
use permat::filtration::{feed, FiltrationRecord};
use permat::matrices::{BoundaryMatrix, ChainMatrix, RuMatrix};
use permat::reduction::{chunk_reduction, standard_reduction, twist_reduction, CancelFlag};

/// Records for a simplicial filtration given as `(vertex tuple, value)` in
/// insertion order. Boundaries carry the simplicial alternating signs
/// reduced into the field, so `∂∂ = 0` holds by construction; faces must
/// have been inserted before their cofaces.
pub fn simplicial_records<CF: NonZeroCoefficient>(
    simplices: &[(Vec<u64>, f64)],
) -> Vec<FiltrationRecord> {
    let mut ids: FxHashMap<Vec<u64>, u64> = FxHashMap::default();
    let mut records = Vec::new();
    for (vertices, filtration) in simplices {
        assert!(
            vertices.windows(2).all(|w| w[0] < w[1]),
            "vertex tuples must be sorted"
        );
        let id = records.len() as u64;
        ids.insert(vertices.clone(), id);
        let dimension = (vertices.len() - 1) as u32;
        let (mut boundary, mut coefficients) = (Vec::new(), Vec::new());
        if vertices.len() > 1 {
            let minus_one = CF::CHARACTERISTIC - 1;
            for omit in 0..vertices.len() {
                let mut face = vertices.clone();
                face.remove(omit);
                let face_id = *ids
                    .get(&face)
                    .unwrap_or_else(|| panic!("face {face:?} missing from the filtration"));
                boundary.push(face_id);
                coefficients.push(if omit % 2 == 0 { 1 } else { minus_one });
            }
            // boundaries must be sorted by face id
            let mut zipped: Vec<_> = boundary.into_iter().zip(coefficients).collect();
            zipped.sort_unstable_by_key(|&(face, _)| face);
            boundary = zipped.iter().map(|&(face, _)| face).collect();
            coefficients = zipped.iter().map(|&(_, coeff)| coeff).collect();
        }
        let coefficients = (!boundary.is_empty()).then_some(coefficients);
        records.push(FiltrationRecord {
            id,
            dimension,
            boundary,
            coefficients,
            filtration: *filtration,
        });
    }
    records
}

/// All simplices of the filled triangle, spec scenario 1: vertices at 0,
/// edges at 1, the face at 2.
pub fn triangle_simplices() -> Vec<(Vec<u64>, f64)> {
    vec![
        (vec![0], 0.0),
        (vec![1], 0.0),
        (vec![2], 0.0),
        (vec![0, 1], 1.0),
        (vec![1, 2], 1.0),
        (vec![0, 2], 1.0),
        (vec![0, 1, 2], 2.0),
    ]
}

/// The five-triangle Möbius band on vertices 0..5.
pub fn moebius_simplices() -> Vec<(Vec<u64>, f64)> {
    let triangles = [[0, 1, 2], [1, 2, 3], [2, 3, 4], [0, 3, 4], [0, 1, 4]];
    let mut simplices: Vec<(Vec<u64>, f64)> = (0..5).map(|v| (vec![v], 0.0)).collect();
    let mut edges: Vec<Vec<u64>> = Vec::new();
    for triangle in &triangles {
        for omit in 0..3 {
            let mut edge = triangle.to_vec();
            edge.remove(omit);
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }
    edges.sort();
    simplices.extend(edges.into_iter().map(|e| (e, 1.0)));
    simplices.extend(triangles.iter().map(|t| (t.to_vec(), 2.0)));
    simplices
}

/// The boundary of the tetrahedron, a 2-sphere.
pub fn sphere_simplices() -> Vec<(Vec<u64>, f64)> {
    let mut simplices: Vec<(Vec<u64>, f64)> = (0..4).map(|v| (vec![v], 0.0)).collect();
    for a in 0..4u64 {
        for b in (a + 1)..4 {
            simplices.push((vec![a, b], 1.0));
        }
    }
    for omit in (0..4u64).rev() {
        let face: Vec<u64> = (0..4).filter(|&v| v != omit).collect();
        simplices.push((face, 2.0));
    }
    simplices
}

/// Multiset view of index pairs for order-insensitive comparison.
pub fn sorted_pairs(mut pairs: Vec<IndexPair>) -> Vec<IndexPair> {
    pairs.sort();
    pairs
}

/// Reduce the same records through every species and driver and demand one
/// multiset of pairs (the boundary, R-U and chain matrices must agree, and
/// so must the standard, twist and chunk drivers).
pub fn pairs_all_species<CF>(records: &[FiltrationRecord]) -> Vec<IndexPair>
where
    CF: NonZeroCoefficient + Invertible + Send + Sync,
{
    let cancel = CancelFlag::new();

    let mut standard = BoundaryMatrix::<VectorColumn<CF>>::new();
    feed(&mut standard, records.to_vec()).unwrap();
    standard_reduction(&mut standard, &cancel).unwrap();
    let reference = sorted_pairs(standard.index_pairs().pairs);

    let mut twist = BoundaryMatrix::<VectorColumn<CF>>::new();
    feed(&mut twist, records.to_vec()).unwrap();
    twist_reduction(&mut twist, &cancel).unwrap();
    assert_eq!(reference, sorted_pairs(twist.index_pairs().pairs), "twist");

    let mut chunk = BoundaryMatrix::<VectorColumn<CF>>::new();
    feed(&mut chunk, records.to_vec()).unwrap();
    chunk_reduction(&mut chunk, &cancel).unwrap();
    assert_eq!(reference, sorted_pairs(chunk.index_pairs().pairs), "chunk");

    let mut ru = RuMatrix::<VectorColumn<CF>>::new();
    feed(&mut ru, records.to_vec()).unwrap();
    standard_reduction(&mut ru, &cancel).unwrap();
    assert_eq!(reference, sorted_pairs(ru.index_pairs().pairs), "ru");

    let mut chain = ChainMatrix::<VectorColumn<CF>>::new();
    feed(&mut chain, records.to_vec()).unwrap();
    assert_eq!(reference, sorted_pairs(chain.index_pairs().pairs), "chain");

    reference
}

/// Verify `R = D·U` by dense arithmetic in the field.
pub fn assert_r_equals_du<C: Column>(m: &RuMatrix<C>) {
    let p = C::Coefficient::CHARACTERISTIC;
    let n = m.n_columns();
    for j in 0..n {
        let mut acc = vec![0u64; n];
        for u in m.u_entries(j) {
            for d in m.boundary(u.row) {
                acc[d.row] = (acc[d.row] + u.coeff.value() * d.coeff.value()) % p;
            }
        }
        let mut r = vec![0u64; n];
        for e in m.r_entries(j) {
            r[e.row] = e.coeff.value();
        }
        assert_eq!(acc, r, "R = D*U violated in column {j}");
    }
}

/// A small random-ish simplicial filtration on five vertices, driven by a
/// choice string: every step inserts one currently insertable edge or
/// triangle.
pub fn random_complex(choices: &[u8]) -> Vec<(Vec<u64>, f64)> {
    let mut candidates: Vec<Vec<u64>> = Vec::new();
    for a in 0..5u64 {
        for b in (a + 1)..5 {
            candidates.push(vec![a, b]);
            for c in (b + 1)..5 {
                candidates.push(vec![a, b, c]);
            }
        }
    }

    let mut simplices: Vec<(Vec<u64>, f64)> = (0..5).map(|v| (vec![v], 0.0)).collect();
    let mut present: FxHashSet<Vec<u64>> = (0..5).map(|v| vec![v]).collect();
    for &choice in choices {
        let insertable: Vec<&Vec<u64>> = candidates
            .iter()
            .filter(|simplex| {
                !present.contains(*simplex)
                    && (0..simplex.len()).all(|omit| {
                        let mut face = (*simplex).clone();
                        face.remove(omit);
                        present.contains(&face)
                    })
            })
            .collect();
        if insertable.is_empty() {
            break;
        }
        let pick = insertable[choice as usize % insertable.len()].clone();
        present.insert(pick.clone());
        simplices.push((pick, 0.0));
    }
    simplices
}

/// The record stream after transposing cells `i` and `i+1`, with ids and
/// boundary references renamed.
pub fn transpose_records(records: &[FiltrationRecord], i: usize) -> Vec<FiltrationRecord> {
    let mut records = records.to_vec();
    records.swap(i, i + 1);
    for (id, record) in records.iter_mut().enumerate() {
        record.id = id as u64;
        let n_faces = record.boundary.len();
        let unit_coefficients = vec![1u64; n_faces];
        let coefficients = record
            .coefficients
            .clone()
            .unwrap_or(unit_coefficients);
        let mut zipped: Vec<(u64, u64)> = record
            .boundary
            .iter()
            .zip(coefficients)
            .map(|(&face, coeff)| {
                let face = if face == i as u64 {
                    (i + 1) as u64
                } else if face == (i + 1) as u64 {
                    i as u64
                } else {
                    face
                };
                (face, coeff)
            })
            .collect();
        zipped.sort_unstable_by_key(|&(face, _)| face);
        record.boundary = zipped.iter().map(|&(face, _)| face).collect();
        if record.coefficients.is_some() {
            record.coefficients = Some(zipped.iter().map(|&(_, coeff)| coeff).collect());
        }
    }
    records
}

/// Count pairs of a given dimension, finite or essential.
pub fn count_pairs(pairs: &[IndexPair], dimension: u32, finite: bool) -> usize {
    pairs
        .iter()
        .filter(|p| p.dimension == dimension && p.death.is_some() == finite)
        .count()
}
