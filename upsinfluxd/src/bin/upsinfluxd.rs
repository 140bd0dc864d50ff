//
// Copyright (c) Memfault, Inc.
// See License.txt for details
fn main() {
    upsinfluxd::cli::main()
}
