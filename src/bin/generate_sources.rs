use std::fs;
use std::path::{Path, PathBuf};

/// Writes a small deterministic sample input set (H–He) plus a matching
/// config, so the pipeline can run end-to-end without network access:
///
/// ```text
/// generate_sources [dir]     # default: sample_sources/
/// atomweave <dir>/atomweave.toml
/// ```

const WEIGHTS: &str = "\
Atomic Number = 1
Atomic Symbol = H
Mass Number = 1
Relative Atomic Mass = 1.00782503224(9)
Isotopic Composition = 0.999885(70)
Standard Atomic Weight = [1.00784,1.00811]
Notes = m

Atomic Number = 1
Atomic Symbol = D
Mass Number = 2
Relative Atomic Mass = 2.01410177811(12)
Isotopic Composition = 0.000115(70)
Standard Atomic Weight = [1.00784,1.00811]
Notes = m

Atomic Number = 2
Atomic Symbol = He
Mass Number = 3
Relative Atomic Mass = 3.01602932265(22)
Isotopic Composition = 0.00000134(3)
Standard Atomic Weight = 4.002602(2)
Notes = g,r

Atomic Number = 2
Atomic Symbol = He
Mass Number = 4
Relative Atomic Mass = 4.00260325413(6)
Isotopic Composition = 0.99999866(3)
Standard Atomic Weight = 4.002602(2)
Notes = g,r
";

const IONIZATION: &str = "\
At. Num | Sp. Name | Ion Charge | Ionization Energy (eV) |
--------|----------|------------|------------------------|
      1 | H I      |          0 | 13.598434599702        |
      2 | He I     |          0 | 24.587389011           |
      2 | He II    |          1 | 54.4177655282          |
";

const GFALL: &str = "\
# wavelength(nm)  log_gf  code   e_lower(cm-1)  j_lo  e_upper(cm-1)  j_up
   121.5670      -0.351   1.00        0.000      0.5    82259.158     1.5
   102.5722      -1.271   1.00        0.000      0.5    97492.304     1.5
    97.2537      -1.758   1.00        0.000      0.5   102823.904     1.5
    58.4334      -0.757   2.00        0.000      0.0   171134.897     1.0
    53.7030      -1.402   2.00        0.000      0.0   186209.365     1.0
    30.3780      -0.351   2.01        0.000      0.5   329179.295     1.5
";

const H_1_LEVELS: &str = "\
# index  energy(cm-1)  j    label
0        0.000         0.5  1s 2S1/2
1        82258.919     0.5  2p 2P1/2
2        82259.285     1.5  2p 2P3/2
";

const H_1_LINES: &str = "\
# lower  upper  wavelength(nm)  gf
0        1      121.5674        0.2774
0        2      121.5668        0.5549
";

const H_1_COLLISIONS: &str = "\
# lower  upper  T(K)     strength
0        1      10000.0  0.29
0        2      10000.0  0.55
";

const HE_1_LEVELS: &str = "\
0  0.000       0.0  1s2 1S0
1  159855.974  1.0  1s2s 3S1
2  166277.440  0.0  1s2s 1S0
";

const HE_1_LINES: &str = "\
0  1  62.556  0.0001
0  2  60.140  0.0002
";

const HE_1_COLLISIONS: &str = "\
0  1  10000.0  0.069
0  2  10000.0  0.031
";

const HE_2_LEVELS: &str = "\
0  0.000       0.5  1s 2S1/2
1  329179.295  0.5  2p 2P1/2
";

const HE_2_LINES: &str = "\
0  1  30.3786  0.2774
";

const ZETA: &str = "\
# Knox & Long ground-state recombination fractions
# T[K]: 2000 4000 6000 8000 10000
1 1 0.339 0.254 0.211 0.183 0.163
2 1 0.581 0.413 0.344 0.304 0.278
2 2 0.672 0.508 0.433 0.390 0.361
";

fn write(path: &Path, contents: &str) {
    fs::write(path, contents)
        .unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
}

fn main() {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_sources"));

    let chianti = dir.join("chianti_db");
    fs::create_dir_all(&chianti).expect("Failed to create output directory");

    write(&dir.join("weights.txt"), WEIGHTS);
    write(&dir.join("ionization.txt"), IONIZATION);
    write(&dir.join("gfall.dat"), GFALL);
    write(&dir.join("zeta.dat"), ZETA);

    write(&chianti.join("h_1.levels"), H_1_LEVELS);
    write(&chianti.join("h_1.lines"), H_1_LINES);
    write(&chianti.join("h_1.collisions"), H_1_COLLISIONS);
    write(&chianti.join("he_1.levels"), HE_1_LEVELS);
    write(&chianti.join("he_1.lines"), HE_1_LINES);
    write(&chianti.join("he_1.collisions"), HE_1_COLLISIONS);
    write(&chianti.join("he_2.levels"), HE_2_LEVELS);
    write(&chianti.join("he_2.lines"), HE_2_LINES);

    let config = format!(
        r#"weights_source = "{dir}/weights.txt"
ionization_source = "{dir}/ionization.txt"
lines_source = "{dir}/gfall.dat"
levels_dir = "{dir}/chianti_db"
zeta_source = "{dir}/zeta.dat"

weights_range = "H-He"
ionization_range = "H-He"
lines_range = "H-He"
levels_range = "H-He"

include_collisions = true
levels_priority = 20

staging_path = "{dir}/staged_gfall.dat"
output_path = "{dir}/atom_data.parquet"
"#,
        dir = dir.display()
    );
    write(&dir.join("atomweave.toml"), &config);

    println!(
        "Wrote sample sources to {}; run: atomweave {}",
        dir.display(),
        dir.join("atomweave.toml").display()
    );
}
