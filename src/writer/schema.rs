//! DDL for a freshly created archive. Table and index names are shared
//! between the writer (this module) and the reader (`queries.rs`,
//! `metadata.rs`, `chromatogram.rs`, `rtree.rs`) — keep them in sync.
//!
//! `meta_archive` replaces the legacy single-row header table; everything
//! else follows the mzDB 0.7 layout.

pub const MZDB_SCHEMA: &str = "
CREATE TABLE data_processing (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE data_encoding (
    id INTEGER PRIMARY KEY,
    mode TEXT(10) NOT NULL,
    compression TEXT(8) NOT NULL,
    byte_order TEXT(13) NOT NULL,
    mz_precision INTEGER(2) NOT NULL,
    intensity_precision INTEGER(2) NOT NULL,
    param_tree TEXT
);

CREATE TABLE software (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    param_tree TEXT NOT NULL,
    shared_param_tree_id INTEGER
);

CREATE TABLE processing_method (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL,
    param_tree TEXT NOT NULL,
    shared_param_tree_id INTEGER,
    data_processing_id INTEGER NOT NULL,
    software_id INTEGER NOT NULL
);

CREATE TABLE sample (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    param_tree TEXT,
    shared_param_tree_id INTEGER
);

CREATE TABLE source_file (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    param_tree TEXT NOT NULL,
    shared_param_tree_id INTEGER
);

CREATE TABLE instrument_configuration (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    param_tree TEXT,
    component_list TEXT NOT NULL,
    shared_param_tree_id INTEGER,
    software_id INTEGER
);

CREATE TABLE meta_archive (
    version TEXT NOT NULL,
    creation_timestamp TEXT NOT NULL,
    file_content TEXT NOT NULL,
    contacts TEXT NOT NULL,
    param_tree TEXT NOT NULL
);

CREATE TABLE run (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    start_timestamp TEXT,
    param_tree TEXT NOT NULL,
    shared_param_tree_id INTEGER,
    sample_id INTEGER,
    default_instrument_config_id INTEGER NOT NULL,
    default_source_file_id INTEGER,
    default_scan_processing_id INTEGER NOT NULL,
    default_chrom_processing_id INTEGER NOT NULL
);

CREATE TABLE tmp_spectrum (
    id INTEGER PRIMARY KEY,
    initial_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    cycle INTEGER NOT NULL,
    time REAL NOT NULL,
    ms_level INTEGER NOT NULL,
    activation_type TEXT,
    tic REAL NOT NULL,
    base_peak_mz REAL NOT NULL,
    base_peak_intensity REAL NOT NULL,
    main_precursor_mz REAL,
    main_precursor_charge INTEGER,
    data_points_count INTEGER NOT NULL,
    param_tree TEXT,
    scan_list TEXT,
    precursor_list TEXT,
    product_list TEXT,
    shared_param_tree_id INTEGER,
    instrument_configuration_id INTEGER NOT NULL,
    source_file_id INTEGER NOT NULL,
    run_id INTEGER NOT NULL,
    data_processing_id INTEGER NOT NULL,
    data_encoding_id INTEGER NOT NULL,
    bb_first_spectrum_id INTEGER NOT NULL
);

CREATE TABLE run_slice (
    id INTEGER PRIMARY KEY,
    ms_level INTEGER NOT NULL,
    number INTEGER NOT NULL,
    begin_mz REAL NOT NULL,
    end_mz REAL NOT NULL,
    param_tree TEXT,
    run_id INTEGER NOT NULL
);

CREATE TABLE bounding_box (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data BLOB NOT NULL,
    run_slice_id INTEGER NOT NULL,
    first_spectrum_id INTEGER NOT NULL,
    last_spectrum_id INTEGER NOT NULL
);

CREATE VIRTUAL TABLE bounding_box_rtree USING rtree(
    id INTEGER,
    min_mz REAL,
    max_mz REAL,
    min_time REAL,
    max_time REAL
);

CREATE VIRTUAL TABLE bounding_box_msn_rtree USING rtree(
    id INTEGER,
    min_ms_level INTEGER,
    max_ms_level INTEGER,
    min_parent_mz REAL,
    max_parent_mz REAL,
    min_mz REAL,
    max_mz REAL,
    min_time REAL,
    max_time REAL
);

CREATE TABLE cv (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    version TEXT NOT NULL,
    uri TEXT NOT NULL
);

CREATE TABLE cv_term (
    accession TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit_accession TEXT,
    cv_id TEXT NOT NULL
);

CREATE TABLE user_term (
    name TEXT PRIMARY KEY,
    type TEXT NOT NULL
);

CREATE TABLE cv_unit (
    accession TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    cv_id TEXT NOT NULL
);

CREATE TABLE chromatogram (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    activation_type TEXT,
    param_tree TEXT NOT NULL,
    precursor TEXT,
    product TEXT,
    shared_param_tree_id INTEGER,
    run_id INTEGER NOT NULL,
    data_processing_id INTEGER NOT NULL,
    data_encoding_id INTEGER NOT NULL,
    data_points BLOB NOT NULL
);
";
